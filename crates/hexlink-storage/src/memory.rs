use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hexlink_core::store::{ReadStore, Result, Store, UrlMapping};
use hexlink_core::ShortKey;
use tracing::trace;

/// In-memory implementation of the Store trait using DashMap.
///
/// DashMap shards its locks, so reads and writes to different keys do not
/// block each other, and `put_if_absent` can use the entry API to check and
/// insert under a single shard lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    storage: DashMap<String, String>,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Number of stored mappings.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl ReadStore for InMemoryStore {
    async fn get(&self, key: &ShortKey) -> Result<Option<UrlMapping>> {
        trace!(key = %key, "in-memory get");

        Ok(self
            .storage
            .get(key.as_str())
            .map(|long_url| UrlMapping::new(key.clone(), long_url.value().clone())))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put(&self, mapping: &UrlMapping) -> Result<()> {
        trace!(key = %mapping.id, "in-memory put");

        self.storage
            .insert(mapping.id.as_str().to_owned(), mapping.long_url.clone());
        Ok(())
    }

    async fn put_if_absent(&self, mapping: &UrlMapping) -> Result<bool> {
        match self.storage.entry(mapping.id.as_str().to_owned()) {
            Entry::Occupied(_) => {
                trace!(key = %mapping.id, "in-memory put_if_absent: key taken");
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(mapping.long_url.clone());
                trace!(key = %mapping.id, "in-memory put_if_absent: inserted");
                Ok(true)
            }
        }
    }
}
