//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format: expected 64 bytes, got {0}")]
    InvalidSignatureFormat(usize),

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Value could not be reduced to canonical bytes
    #[error("Canonical encoding failed: {0}")]
    Encoding(String),
}
