use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors related to the core types of the URL shortener.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid short key: {0}")]
    InvalidShortKey(String),
}

/// Failures talking to the backing key-value store.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("digest unavailable: {0}")]
    DigestUnavailable(String),
    #[error("unable to find a free short key after {attempts} attempts")]
    KeySpaceExhausted { attempts: u32 },
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
}
