//! Deterministic short-key derivation from long URLs.

pub mod digest;
pub mod error;

pub use digest::{DeriverSettings, DigestAlgorithm, DigestDeriver};
pub use error::DeriveError;

use hexlink_core::ShortKey;

/// Trait for deriving short keys.
///
/// Implementations are pure functions of their input: no I/O, no
/// internal state that changes between calls. Anything that can fail
/// (e.g. an unsupported digest) fails when the deriver is built.
pub trait KeyDeriver: Send + Sync + 'static {
    /// Derives the short key for `input`.
    fn derive(&self, input: &str) -> ShortKey;
}

impl<D: KeyDeriver + ?Sized> KeyDeriver for Box<D> {
    fn derive(&self, input: &str) -> ShortKey {
        (**self).derive(input)
    }
}

impl<D: KeyDeriver + ?Sized> KeyDeriver for std::sync::Arc<D> {
    fn derive(&self, input: &str) -> ShortKey {
        (**self).derive(input)
    }
}
