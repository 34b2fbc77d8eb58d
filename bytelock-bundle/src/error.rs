//! Error types for the bundle crate.

use bytelock_crypto::{CryptoError, DecryptionError};
use thiserror::Error;

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error("bundle has no manifest at {0}")]
    MissingManifest(String),

    #[error("manifest validation error: {0}")]
    InvalidManifest(String),

    #[error("artifact {id} appears more than once ({first} and {second})")]
    DuplicateArtifact {
        id: String,
        first: String,
        second: String,
    },

    #[error("bundle is already sealed (found {0})")]
    AlreadySealed(String),

    #[error("unknown artifact: {0}")]
    UnknownArtifact(String),

    #[error("missing entry: {0}")]
    MissingEntry(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<bytelock_crypto::KeyDerivationError> for BundleError {
    fn from(e: bytelock_crypto::KeyDerivationError) -> Self {
        Self::Crypto(e.into())
    }
}

impl From<bytelock_crypto::CipherError> for BundleError {
    fn from(e: bytelock_crypto::CipherError) -> Self {
        Self::Crypto(e.into())
    }
}
