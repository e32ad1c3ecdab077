//! Credential Storage Abstractions
//!
//! Access credentials are persisted sealed. The encryption scheme belongs to
//! the host (KMS, libsodium, platform keystore); the core only calls
//! [`CredentialCipher`] at the persistence boundary.

use crate::error::{BridgeError, Result};

/// Seals credentials before they are written and opens them after they are
/// read.
///
/// Implementations used for stored credentials should be deterministic so
/// sealed values can be compared for equality.
pub trait CredentialCipher: Send + Sync {
    fn seal(&self, plaintext: &str) -> Result<String>;

    fn open(&self, sealed: &str) -> Result<String>;
}

/// Cipher that stores credentials as-is.
///
/// Only suitable for tests and local development databases.
#[derive(Debug, Clone, Default)]
pub struct PassthroughCipher;

impl CredentialCipher for PassthroughCipher {
    fn seal(&self, plaintext: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn open(&self, sealed: &str) -> Result<String> {
        if sealed.is_empty() {
            return Err(BridgeError::OperationFailed(
                "empty sealed credential".to_string(),
            ));
        }
        Ok(sealed.to_string())
    }
}
