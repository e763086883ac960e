//! # Ed25519 Signatures
//!
//! Reference implementation of the mesh identity service.
//!
//! ## Security Properties
//!
//! - No RNG dependency when signing (deterministic nonce from message)
//! - Secret seed zeroized on drop

use crate::CryptoError;
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use shared_types::{NodeId, PublicKey, Signature, SignatureVerifier, Signer};
use zeroize::Zeroize;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes, rejecting points not on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&array).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat(signature.len()))?;
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl From<Ed25519PublicKey> for PublicKey {
    fn from(key: Ed25519PublicKey) -> Self {
        PublicKey(key.0.to_vec())
    }
}

/// Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

/// A node identity: node id bound to an Ed25519 keypair.
pub struct Ed25519Identity {
    node_id: NodeId,
    keypair: Ed25519KeyPair,
}

impl Ed25519Identity {
    pub fn new(node_id: NodeId, keypair: Ed25519KeyPair) -> Self {
        Self { node_id, keypair }
    }

    pub fn generate(node_id: NodeId) -> Self {
        Self::new(node_id, Ed25519KeyPair::generate())
    }
}

impl Signer for Ed25519Identity {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn public_key(&self) -> PublicKey {
        self.keypair.public_key().into()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.keypair.sign(message).to_vec())
    }
}

/// Stateless Ed25519 verifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        Ed25519PublicKey::from_bytes(public_key.as_bytes())
            .and_then(|key| key.verify(message, signature.as_bytes()))
            .is_ok()
    }
}
