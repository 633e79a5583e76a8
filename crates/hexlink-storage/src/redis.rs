use async_trait::async_trait;
use hexlink_core::store::{ReadStore, Result, Store, UrlMapping};
use hexlink_core::{ShortKey, StorageError};
use redis::AsyncCommands;
use tracing::{debug, trace, warn};

/// Default key prefix, matching the hash name mappings were historically stored under.
pub const DEFAULT_KEY_PREFIX: &str = "UrlMapping:";

/// A Redis-backed implementation of [`Store`].
///
/// Each mapping is stored as the JSON encoding of [`UrlMapping`] under
/// `<prefix><key>`. `put_if_absent` is a single `SET NX`, so the check and
/// the write are atomic on the server.
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> StorageError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        StorageError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StorageError::Unavailable(message)
    } else {
        StorageError::Operation(message)
    }
}

impl RedisStore {
    /// Creates a new Redis store.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a new Redis store with a custom key prefix.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    /// * `key_prefix` - Custom prefix for store keys (e.g., "myapp:url:")
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a client for `url` and creates a store on a multiplexed connection.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| map_redis_error("failed to create Redis client", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::new(conn))
    }

    /// Generates the Redis key for a short key.
    fn store_key(&self, key: &ShortKey) -> String {
        format!("{}{}", self.key_prefix, key.as_str())
    }

    fn encode(mapping: &UrlMapping) -> Result<String> {
        serde_json::to_string(mapping).map_err(|e| {
            StorageError::InvalidData(format!("failed to serialize mapping '{}': {e}", mapping.id))
        })
    }
}

#[async_trait]
impl ReadStore for RedisStore {
    async fn get(&self, key: &ShortKey) -> Result<Option<UrlMapping>> {
        let store_key = self.store_key(key);
        trace!(key = %key, "Fetching mapping from Redis");

        let mut conn = self.conn.clone();
        let raw = conn
            .get::<_, Option<String>>(&store_key)
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "Redis error on get");
                map_redis_error("failed to fetch value from Redis", e)
            })?;

        let Some(raw) = raw else {
            trace!(key = %key, "Key not present in Redis");
            return Ok(None);
        };

        match serde_json::from_str::<UrlMapping>(&raw) {
            Ok(mapping) => {
                debug!(key = %key, "Found mapping in Redis");
                Ok(Some(mapping))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to deserialize stored mapping");
                Err(StorageError::InvalidData(format!(
                    "invalid stored value for key '{store_key}': {e}"
                )))
            }
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn put(&self, mapping: &UrlMapping) -> Result<()> {
        let store_key = self.store_key(&mapping.id);
        let json = Self::encode(mapping)?;
        trace!(key = %mapping.id, "Writing mapping to Redis");

        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(&store_key, json).await.map_err(|e| {
            warn!(key = %mapping.id, error = %e, "Failed to write mapping to Redis");
            map_redis_error("failed to write value to Redis", e)
        })?;

        debug!(key = %mapping.id, "Stored mapping in Redis");
        Ok(())
    }

    async fn put_if_absent(&self, mapping: &UrlMapping) -> Result<bool> {
        let store_key = self.store_key(&mapping.id);
        let json = Self::encode(mapping)?;
        trace!(key = %mapping.id, "Conditionally writing mapping to Redis");

        let mut conn = self.conn.clone();
        let created = conn
            .set_nx::<_, _, bool>(&store_key, json)
            .await
            .map_err(|e| {
                warn!(key = %mapping.id, error = %e, "Failed to conditionally write mapping to Redis");
                map_redis_error("failed to conditionally write value to Redis", e)
            })?;

        debug!(key = %mapping.id, created, "Conditional write finished");
        Ok(created)
    }
}
