//! # SHA-256 Content Hashing
//!
//! Every content-addressed record in the mesh (ban proofs, slashing evidence,
//! verdicts, policy configs) is hashed over its canonical JSON form:
//! object keys sorted, no insignificant whitespace. Two nodes holding the same
//! logical value always derive the same hash.

use crate::CryptoError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared_types::ContentHash;

/// Hash raw bytes.
pub fn sha256(data: &[u8]) -> ContentHash {
    let digest = Sha256::digest(data);
    ContentHash(digest.into())
}

/// Canonical JSON bytes of `value`.
///
/// Round-trips through `serde_json::Value`, whose object map is ordered by
/// key, so struct field order and `HashMap` iteration order never leak into
/// the encoding.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let tree = serde_json::to_value(value).map_err(|e| CryptoError::Encoding(e.to_string()))?;
    serde_json::to_vec(&tree).map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// SHA-256 over the canonical JSON encoding of `value`.
pub fn hash_canonical<T: Serialize + ?Sized>(value: &T) -> Result<ContentHash, CryptoError> {
    Ok(sha256(&canonical_json(value)?))
}
