use crate::error::DeriveError;
use crate::KeyDeriver;
use hexlink_core::ShortKey;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use typed_builder::TypedBuilder;

/// Cryptographic digests a [`DigestDeriver`] can truncate into keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// 128-bit MD5, the reference key space.
    #[default]
    Md5,
    /// 256-bit SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Size of the digest output in bytes.
    pub fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 16,
            DigestAlgorithm::Sha256 => 32,
        }
    }

    fn digest(self, input: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Md5 => Md5::digest(input).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(input).to_vec(),
        }
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestAlgorithm::Md5 => write!(f, "md5"),
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DeriveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => Err(DeriveError::DigestUnavailable(format!(
                "unsupported digest algorithm '{other}'"
            ))),
        }
    }
}

/// Configures a [`DigestDeriver`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct DeriverSettings {
    #[builder(default)]
    pub algorithm: DigestAlgorithm,
    /// Number of leading digest bytes kept; each renders as two hex characters.
    #[builder(default = 3)]
    pub key_bytes: usize,
}

impl Default for DeriverSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Derives keys by hashing the UTF-8 input and hex-encoding a digest prefix.
///
/// With the default settings (MD5, 3 bytes) this yields 6-character keys,
/// e.g. `https://www.example.com` -> `e149be`.
#[derive(Debug, Clone)]
pub struct DigestDeriver {
    algorithm: DigestAlgorithm,
    key_bytes: usize,
}

impl DigestDeriver {
    /// Builds a deriver, rejecting prefixes the digest cannot supply.
    pub fn new(settings: DeriverSettings) -> Result<Self, DeriveError> {
        let max = settings.algorithm.output_len();
        if settings.key_bytes == 0 || settings.key_bytes > max {
            return Err(DeriveError::DigestUnavailable(format!(
                "{} produces {} bytes, cannot take a {}-byte key",
                settings.algorithm, max, settings.key_bytes
            )));
        }

        Ok(Self {
            algorithm: settings.algorithm,
            key_bytes: settings.key_bytes,
        })
    }

    /// The reference configuration: MD5 truncated to 3 bytes.
    pub fn md5() -> Self {
        Self {
            algorithm: DigestAlgorithm::Md5,
            key_bytes: 3,
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn key_bytes(&self) -> usize {
        self.key_bytes
    }

    /// Size of the key space, `256^key_bytes`, saturating at `u128::MAX`.
    pub fn key_space(&self) -> u128 {
        1_u128
            .checked_shl(8 * self.key_bytes as u32)
            .unwrap_or(u128::MAX)
    }
}

impl Default for DigestDeriver {
    fn default() -> Self {
        Self::md5()
    }
}

impl KeyDeriver for DigestDeriver {
    fn derive(&self, input: &str) -> ShortKey {
        let digest = self.algorithm.digest(input.as_bytes());
        ShortKey::new_unchecked(hex::encode(&digest[..self.key_bytes]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_reference_keys() {
        let deriver = DigestDeriver::md5();

        assert_eq!(deriver.derive("https://www.example.com").as_str(), "e149be");
        assert_eq!(deriver.derive("https://www.example.com/abc").as_str(), "3f94b0");
        assert_eq!(deriver.derive("https://www.example.com/abc1").as_str(), "7eebb0");
    }

    #[test]
    fn derive_is_deterministic() {
        let deriver = DigestDeriver::md5();

        for input in ["", "a", "https://rust-lang.org", "ünïcödé"] {
            let first = deriver.derive(input);
            let second = deriver.derive(input);
            assert_eq!(first, second);
            assert_eq!(first.as_str().len(), 6);
            assert!(ShortKey::new(first.as_str()).is_ok());
        }
    }

    #[test]
    fn empty_input_is_zero_padded_hex() {
        // md5("") = d41d8cd9...
        assert_eq!(DigestDeriver::md5().derive("").as_str(), "d41d8c");
    }

    #[test]
    fn key_bytes_controls_length() {
        let deriver = DigestDeriver::new(DeriverSettings::builder().key_bytes(5).build()).unwrap();
        let key = deriver.derive("https://www.example.com");

        assert_eq!(key.as_str().len(), 10);
        assert!(key.as_str().starts_with("e149be"));
    }

    #[test]
    fn sha256_prefix() {
        let settings = DeriverSettings::builder()
            .algorithm(DigestAlgorithm::Sha256)
            .build();
        let deriver = DigestDeriver::new(settings).unwrap();

        // sha256("abc") = ba7816bf...
        assert_eq!(deriver.derive("abc").as_str(), "ba7816");
    }

    #[test]
    fn oversized_prefix_is_unavailable() {
        let settings = DeriverSettings::builder().key_bytes(17).build();
        let err = DigestDeriver::new(settings).unwrap_err();
        assert!(matches!(err, DeriveError::DigestUnavailable(_)));

        let settings = DeriverSettings::builder().key_bytes(0).build();
        assert!(DigestDeriver::new(settings).is_err());
    }

    #[test]
    fn algorithm_from_str() {
        assert_eq!("MD5".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Md5);
        assert_eq!(
            "sha256".parse::<DigestAlgorithm>().unwrap(),
            DigestAlgorithm::Sha256
        );
        assert!(matches!(
            "whirlpool".parse::<DigestAlgorithm>(),
            Err(DeriveError::DigestUnavailable(_))
        ));
    }

    #[test]
    fn key_space_of_reference_deriver() {
        assert_eq!(DigestDeriver::md5().key_space(), 16_777_216);
    }
}
