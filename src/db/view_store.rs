use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::AppResult;
use crate::models::ActiveView;

/// Local, per-client memory of the last active view
#[async_trait::async_trait]
pub trait ViewStore: Send + Sync {
    async fn load(&self) -> AppResult<Option<ActiveView>>;

    async fn save(&self, view: ActiveView) -> AppResult<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedView {
    view: ActiveView,
}

/// Keeps the last view in a small JSON file
#[derive(Debug, Clone)]
pub struct FileViewStore {
    path: PathBuf,
}

impl FileViewStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ViewStore for FileViewStore {
    async fn load(&self) -> AppResult<Option<ActiveView>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<PersistedView>(&bytes) {
            Ok(persisted) => Ok(Some(persisted.view)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Ignoring unreadable view state"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, view: ActiveView) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec(&PersistedView { view })?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

/// In-memory view store for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryViewStore {
    view: Arc<Mutex<Option<ActiveView>>>,
}

impl MemoryViewStore {
    pub fn new(initial: Option<ActiveView>) -> Self {
        Self {
            view: Arc::new(Mutex::new(initial)),
        }
    }
}

#[async_trait::async_trait]
impl ViewStore for MemoryViewStore {
    async fn load(&self) -> AppResult<Option<ActiveView>> {
        Ok(*self.view.lock().await)
    }

    async fn save(&self, view: ActiveView) -> AppResult<()> {
        *self.view.lock().await = Some(view);
        Ok(())
    }
}
