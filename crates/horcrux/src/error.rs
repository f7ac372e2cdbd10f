//! error types for horcrux

use thiserror::Error;

use crate::report::Report;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // === handshake errors ===
    #[error("Invalid TOTP code")]
    InvalidCode,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Failed to decrypt")]
    DecryptionFailed,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    // === secret splitting errors ===
    #[error("invalid split parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid share format")]
    InvalidShareFormat,

    #[error("not enough shares: have {have}, need {need}")]
    InsufficientShares { have: usize, need: usize },

    #[error("shares do not belong to the same split")]
    MismatchedShares,

    // === orchestrator errors ===
    #[error("not enough horcrux servers: {need} are required, but only {have} were provided")]
    ConfigurationError { have: usize, need: usize },

    #[error("invalid horcrux list: threshold {threshold} with {num_shards} shards")]
    InvalidThreshold { threshold: usize, num_shards: usize },

    #[error("not enough shards available to recompose master secret:\n{0}")]
    InsufficientShards(Report),

    #[error("Timed out")]
    Timeout,

    #[error("network error: {0}")]
    NetworkError(String),

    /// a holder refused with anything other than a handshake verdict
    #[error("{error}")]
    Rejected { status: u16, error: String },

    // === provisioning token errors ===
    #[error("Unknown state environment format")]
    UnknownFormat,

    #[error("Invalid state environment audience: expected {expected}, got {received}")]
    InvalidAudience { expected: String, received: String },

    #[error("missing environment variable {0}")]
    MissingEnvironment(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
