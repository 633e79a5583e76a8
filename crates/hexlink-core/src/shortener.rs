use crate::error::ShortenerError;
use crate::shortkey::ShortKey;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, ShortenerError>;

/// The caller-facing operations a transport layer builds on.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates (or finds) the mapping for `long_url` and returns its short key.
    async fn create(&self, long_url: &str) -> Result<ShortKey>;

    /// Resolves a short key to the stored long URL.
    ///
    /// Returns `None` if the key was never written. Strings that are not
    /// well-formed short keys can never have been written, so they resolve
    /// to `None` as well.
    async fn resolve(&self, key: &str) -> Result<Option<String>>;
}
