//! Core types and traits for the hexlink URL shortener.
//!
//! This crate provides the types shared by the key deriver, the store
//! backends, the mapping resolver and the HTTP gateway.

pub mod error;
pub mod shortener;
pub mod shortkey;
pub mod store;

pub use error::{CoreError, ShortenerError, StorageError};
pub use shortener::Shortener;
pub use shortkey::ShortKey;
pub use store::{ReadStore, Store, UrlMapping};
