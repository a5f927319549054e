use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dashmovie::api::{create_router, AppState};
use dashmovie::config::Config;
use dashmovie::db::{
    create_redis_client, FileViewStore, MemoryListStore, RedisListStore, SharedListStore,
};
use dashmovie::services::{Dashboard, TmdbProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashmovie=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let provider = Arc::new(TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_language.clone(),
    ));
    let store: Arc<dyn SharedListStore> = if config.use_memory_store {
        tracing::warn!("Using the in-memory list store, shared lists will not survive a restart");
        Arc::new(MemoryListStore::new())
    } else {
        let redis_client = create_redis_client(&config.redis_url)?;
        Arc::new(RedisListStore::new(
            redis_client,
            config.shared_list_key.clone(),
        ))
    };
    let view_store = Arc::new(FileViewStore::new(&config.view_state_path));

    let (dashboard, sync_handle) =
        Dashboard::start(provider, store, view_store, config.tmdb_region.clone()).await;

    let app = create_router(AppState::new(dashboard));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sync_handle.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
