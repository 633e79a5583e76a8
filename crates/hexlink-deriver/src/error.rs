use hexlink_core::ShortenerError;
use thiserror::Error;

/// Errors returned while configuring a key deriver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeriveError {
    #[error("digest unavailable: {0}")]
    DigestUnavailable(String),
}

impl From<DeriveError> for ShortenerError {
    fn from(value: DeriveError) -> Self {
        match value {
            DeriveError::DigestUnavailable(message) => Self::DigestUnavailable(message),
        }
    }
}
