use crate::error::StorageError;
use crate::shortkey::ShortKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A persisted short-key to long-URL mapping.
///
/// Once written under a key, `long_url` is never changed by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMapping {
    /// The short key, also the store's primary key.
    pub id: ShortKey,
    /// The original URL supplied by the caller.
    pub long_url: String,
}

impl UrlMapping {
    pub fn new(id: ShortKey, long_url: impl Into<String>) -> Self {
        Self {
            id,
            long_url: long_url.into(),
        }
    }
}

/// Point lookups against a mapping store.
///
/// [`Store`] extends this with the write operations used by `create`.
#[async_trait]
pub trait ReadStore: Send + Sync + 'static {
    /// Retrieves the mapping stored under `key`.
    /// Returns `None` if the key was never written.
    async fn get(&self, key: &ShortKey) -> Result<Option<UrlMapping>>;
}

#[async_trait]
pub trait Store: ReadStore {
    /// Writes the mapping under its `id`, replacing whatever was there.
    async fn put(&self, mapping: &UrlMapping) -> Result<()>;

    /// Writes the mapping only if its `id` is not present yet.
    ///
    /// Returns `true` if this call created the record and `false` if the
    /// key was already taken. The check and the write happen atomically.
    async fn put_if_absent(&self, mapping: &UrlMapping) -> Result<bool>;
}
