//! Error types for evidence processing

use shared_types::{ContentHash, NodeId};

/// Why a piece of evidence was not acted on.
///
/// `Display` is the human-readable reason; [`code`](Self::code) is the stable
/// reason code reported with the verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlashingError {
    #[error("REPLAY: evidence {} already processed", .0.short_hex(16))]
    Replay(ContentHash),

    #[error("Evidence hash mismatch: declared {}, computed {}", .declared.short_hex(16), .computed.short_hex(16))]
    HashMismatch {
        declared: ContentHash,
        computed: ContentHash,
    },

    #[error("Missing block headers")]
    MissingHeaders,

    #[error("Different heights: {a} vs {b}")]
    HeightMismatch { a: u64, b: u64 },

    #[error("Same block hash - not equivocation")]
    SameBlock,

    #[error("Different validators: {a} vs {b}")]
    ValidatorMismatch { a: NodeId, b: NodeId },

    #[error("Signer {signer} does not match accused {accused}")]
    AccusedMismatch { signer: NodeId, accused: NodeId },

    #[error("Missing signatures")]
    MissingSignature,

    #[error("Same signature on both headers - not two signing events")]
    SameSignature,

    #[error("Accused node {0} not found")]
    UnknownAccused(NodeId),

    #[error("Header signature does not verify under {0}'s registered key")]
    BadSignature(NodeId),

    #[error("Downtime {actual}s below the {minimum}s threshold")]
    InsufficientDowntime { actual: u64, minimum: u64 },

    #[error("No censored transactions listed")]
    NoCensoredTransactions,

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl SlashingError {
    pub fn code(&self) -> &'static str {
        match self {
            SlashingError::Replay(_) => "REPLAY",
            SlashingError::HashMismatch { .. } => "HASH_MISMATCH",
            SlashingError::MissingHeaders => "MISSING_HEADERS",
            SlashingError::HeightMismatch { .. } => "HEIGHT_MISMATCH",
            SlashingError::SameBlock => "SAME_BLOCK",
            SlashingError::ValidatorMismatch { .. } => "VALIDATOR_MISMATCH",
            SlashingError::AccusedMismatch { .. } => "ACCUSED_MISMATCH",
            SlashingError::MissingSignature => "MISSING_SIGNATURE",
            SlashingError::SameSignature => "SAME_SIGNATURE",
            SlashingError::UnknownAccused(_) => "UNKNOWN_ACCUSED",
            SlashingError::BadSignature(_) => "BAD_SIGNATURE",
            SlashingError::InsufficientDowntime { .. } => "INSUFFICIENT_DOWNTIME",
            SlashingError::NoCensoredTransactions => "NO_CENSORED_TXS",
            SlashingError::Encoding(_) => "ENCODING",
        }
    }
}

impl From<shared_crypto::CryptoError> for SlashingError {
    fn from(err: shared_crypto::CryptoError) -> Self {
        SlashingError::Encoding(err.to_string())
    }
}

/// Result type for evidence handling
pub type SlashingResult<T> = Result<T, SlashingError>;
