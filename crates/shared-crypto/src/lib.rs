//! # Shared Crypto
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 over canonical JSON | Content addressing (ban ids, evidence, verdicts) |
//! | `signatures` | Ed25519 | Reference `Signer` / `SignatureVerifier` |
//!
//! The mesh subsystems depend only on the ports in `shared-types`; this crate
//! supplies the concrete identity service the runtime and tests plug in.

#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

pub use errors::CryptoError;
pub use hashing::{canonical_json, hash_canonical, sha256};
pub use signatures::{Ed25519Identity, Ed25519KeyPair, Ed25519PublicKey, Ed25519Verifier};
