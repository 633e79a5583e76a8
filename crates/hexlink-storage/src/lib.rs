//! Store backends for short-key mappings.

pub mod memory;
pub mod redis;

pub use hexlink_core::store::{ReadStore, Result, Store, UrlMapping};
pub use hexlink_core::StorageError;
pub use memory::InMemoryStore;
pub use self::redis::RedisStore;
