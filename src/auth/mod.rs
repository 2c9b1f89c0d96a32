//! Authentication module for API key verification.

mod extractor;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

pub use extractor::{ApiKeyAuth, AuthError};

/// The ingestion API key test runners present in `X-API-Key`.
///
/// `Debug` prints `[REDACTED]` and the value is zeroized on drop.
#[derive(Clone)]
pub struct IngestKey(SecretString);

impl IngestKey {
    pub fn new(key: String) -> Self {
        Self(SecretString::from(key))
    }

    /// Constant-time comparison with the configured key.
    ///
    /// Only the length is compared early; key bytes never short-circuit.
    pub fn verify(&self, provided: &str) -> bool {
        let expected = self.0.expose_secret();
        if expected.is_empty() {
            return false;
        }
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }
}

impl std::fmt::Debug for IngestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IngestKey([REDACTED])")
    }
}
