//! Identity service ports.
//!
//! The mesh never sees key material. It asks a [`Signer`] to sign canonical
//! bytes and a [`SignatureVerifier`] to check them.

use crate::entities::{NodeId, PublicKey, Signature};

/// Signing half of the identity service, bound to one node.
pub trait Signer: Send + Sync {
    fn node_id(&self) -> &NodeId;

    fn public_key(&self) -> PublicKey;

    fn sign(&self, message: &[u8]) -> Signature;
}

/// Verification half of the identity service.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `true` only for a well-formed signature that verifies.
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool;
}
