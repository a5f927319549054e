use ::redis::AsyncCommands;
use ::redis::Client;
use std::collections::HashMap;
use std::fmt::Display;

use crate::db::SharedListStore;
use crate::error::AppResult;
use crate::models::{MovieId, MovieRating, RatingsMap, SharedListDocument};

/// Top-level fields of the shared document, stored as hash fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentField {
    Favorites,
    Seen,
    Ratings,
}

impl DocumentField {
    pub const ALL: [DocumentField; 3] = [
        DocumentField::Favorites,
        DocumentField::Seen,
        DocumentField::Ratings,
    ];

    /// JSON stored in a freshly created document
    fn empty_value(self) -> &'static str {
        match self {
            DocumentField::Favorites | DocumentField::Seen => "[]",
            DocumentField::Ratings => "{}",
        }
    }
}

impl Display for DocumentField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentField::Favorites => write!(f, "favorites"),
            DocumentField::Seen => write!(f, "seen"),
            DocumentField::Ratings => write!(f, "ratings"),
        }
    }
}

/// Creates a Redis client for the shared document
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Shared list document kept in a single Redis hash
///
/// Each top-level field is a JSON value in its own hash field, so replacing
/// one field never touches the others.
#[derive(Clone)]
pub struct RedisListStore {
    redis_client: Client,
    key: String,
}

impl RedisListStore {
    pub fn new(redis_client: Client, key: impl Into<String>) -> Self {
        Self {
            redis_client,
            key: key.into(),
        }
    }

    async fn read_fields(&self) -> AppResult<HashMap<String, String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let fields: HashMap<String, String> = conn.hgetall(&self.key).await?;
        Ok(fields)
    }

    async fn write_field(&self, field: DocumentField, json: String) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.hset(&self.key, field.to_string(), json).await?;
        tracing::debug!(key = %self.key, field = %field, "Replaced shared document field");
        Ok(())
    }

    /// Creates any missing field with its empty value without overwriting others
    async fn create_missing(&self) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        for field in DocumentField::ALL {
            let _: bool = conn
                .hset_nx(&self.key, field.to_string(), field.empty_value())
                .await?;
        }
        tracing::info!(key = %self.key, "Created shared list document");
        Ok(())
    }
}

/// Assembles a document from raw hash fields
///
/// Fields are parsed independently. A missing or unreadable field defaults
/// to empty and is logged; it never takes the other fields down with it.
fn document_from_fields(fields: &HashMap<String, String>) -> SharedListDocument {
    SharedListDocument {
        favorites: parse_field(fields, DocumentField::Favorites).unwrap_or_default(),
        seen: parse_field(fields, DocumentField::Seen).unwrap_or_default(),
        ratings: parse_field::<HashMap<String, serde_json::Value>>(fields, DocumentField::Ratings)
            .map(ratings_from_entries)
            .unwrap_or_default(),
    }
}

fn parse_field<T: serde::de::DeserializeOwned>(
    fields: &HashMap<String, String>,
    field: DocumentField,
) -> Option<T> {
    let json = fields.get(&field.to_string())?;
    match serde_json::from_str(json) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                field = %field,
                error = %e,
                "Unreadable shared document field, using empty"
            );
            None
        }
    }
}

/// Keeps every rating entry that parses; skips the rest
fn ratings_from_entries(entries: HashMap<String, serde_json::Value>) -> RatingsMap {
    entries
        .into_iter()
        .filter_map(|(key, value)| {
            let parsed = key
                .parse::<MovieId>()
                .map_err(|e| e.to_string())
                .and_then(|id| {
                    serde_json::from_value::<MovieRating>(value)
                        .map(|rating| (id, rating))
                        .map_err(|e| e.to_string())
                });
            match parsed {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::warn!(
                        movie = %key,
                        error = %error,
                        "Skipping unreadable stored rating"
                    );
                    None
                }
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl SharedListStore for RedisListStore {
    async fn load_or_create(&self) -> AppResult<SharedListDocument> {
        let mut fields = self.read_fields().await?;

        if fields.len() < DocumentField::ALL.len() {
            self.create_missing().await?;
            fields = self.read_fields().await?;
        }

        Ok(document_from_fields(&fields))
    }

    async fn replace_favorites(&self, favorites: &[MovieId]) -> AppResult<()> {
        self.write_field(DocumentField::Favorites, serde_json::to_string(favorites)?)
            .await
    }

    async fn replace_seen(&self, seen: &[MovieId]) -> AppResult<()> {
        self.write_field(DocumentField::Seen, serde_json::to_string(seen)?)
            .await
    }

    async fn replace_ratings(&self, ratings: &RatingsMap) -> AppResult<()> {
        self.write_field(DocumentField::Ratings, serde_json::to_string(ratings)?)
            .await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
