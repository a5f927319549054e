use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Movie metadata service (TMDB) API key
    pub tmdb_api_key: String,

    /// Movie metadata service base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Locale sent with every metadata request
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// Region used for certifications and watch providers
    #[serde(default = "default_tmdb_region")]
    pub tmdb_region: String,

    /// Redis connection URL for the shared list document
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Fixed key of the shared list document
    #[serde(default = "default_shared_list_key")]
    pub shared_list_key: String,

    /// Keep the shared lists in process memory instead of Redis
    #[serde(default)]
    pub use_memory_store: bool,

    /// File holding the last active view
    #[serde(default = "default_view_state_path")]
    pub view_state_path: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_language() -> String {
    "pt-BR".to_string()
}

fn default_tmdb_region() -> String {
    "BR".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_shared_list_key() -> String {
    "sharedLists:mainList".to_string()
}

fn default_view_state_path() -> String {
    ".dashmovie/view.json".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address string the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
