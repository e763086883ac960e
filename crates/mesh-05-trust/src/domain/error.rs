//! Error types for the trust registry

use super::level::TrustLevel;
use shared_types::{ContentHash, NodeId};

/// Why a gossiped ban proof was refused. Checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BanRejection {
    #[error("REPLAY: ban {} already processed", .0.short_hex(16))]
    Replay(ContentHash),

    #[error("REPLAY: evidence {} already used", .0.short_hex(16))]
    EvidenceReplay(ContentHash),

    #[error("Already banned: {0}")]
    AlreadyBanned(NodeId),

    #[error("Ban expired")]
    Expired,

    #[error("Ban id does not match content")]
    TamperedId,

    #[error("Ban minted for federation {0}")]
    ForeignFederation(String),

    #[error("Unknown issuer: {0}")]
    UnknownIssuer(NodeId),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Declared quorum {declared} is below the local minimum {minimum}")]
    QuorumTooSmall { declared: u32, minimum: u32 },

    #[error("Quorum verification failed: {verified}/{required}")]
    QuorumNotMet { verified: usize, required: usize },

    #[error("Issuer lacks authority: {level}, needs {required}")]
    InsufficientAuthority {
        level: TrustLevel,
        required: TrustLevel,
    },
}

impl BanRejection {
    pub fn code(&self) -> &'static str {
        match self {
            BanRejection::Replay(_) | BanRejection::EvidenceReplay(_) => "REPLAY",
            BanRejection::AlreadyBanned(_) => "ALREADY_BANNED",
            BanRejection::Expired => "EXPIRED",
            BanRejection::TamperedId => "TAMPERED_ID",
            BanRejection::ForeignFederation(_) => "FOREIGN_FEDERATION",
            BanRejection::QuorumTooSmall { .. } => "QUORUM_TOO_SMALL",
            BanRejection::UnknownIssuer(_) => "UNKNOWN_ISSUER",
            BanRejection::InvalidSignature => "INVALID_SIGNATURE",
            BanRejection::QuorumNotMet { .. } => "QUORUM_NOT_MET",
            BanRejection::InsufficientAuthority { .. } => "INSUFFICIENT_AUTHORITY",
        }
    }

    pub fn is_replay(&self) -> bool {
        self.code() == "REPLAY"
    }
}

/// Persistence failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt trust record: {0}")]
    Corrupt(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrustError {
    #[error("{node} is {level}, needs {required}")]
    Unauthorized {
        node: NodeId,
        level: TrustLevel,
        required: TrustLevel,
    },

    #[error("BANNED can only be set through a ban proof")]
    CannotSetBanned,

    #[error("Already banned: {0}")]
    AlreadyBanned(NodeId),

    #[error("No ban to revoke for {0}")]
    NoActiveBan(NodeId),

    #[error("Quorum not met: {valid}/{required} valid signers")]
    QuorumNotMet { valid: usize, required: usize },

    #[error("Quorum {quorum} is below the minimum {minimum}")]
    QuorumTooSmall { quorum: u32, minimum: u32 },

    #[error(transparent)]
    Rejected(#[from] BanRejection),

    #[error("Trust store: {0}")]
    Store(#[from] StoreError),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl From<shared_crypto::CryptoError> for TrustError {
    fn from(err: shared_crypto::CryptoError) -> Self {
        TrustError::Encoding(err.to_string())
    }
}

/// Result type for trust operations
pub type TrustResult<T> = Result<T, TrustError>;
