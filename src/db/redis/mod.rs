pub mod document;

pub use document::create_redis_client;
pub use document::DocumentField;
pub use document::RedisListStore;
