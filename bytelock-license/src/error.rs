//! Error types for the licensing crate.

use std::fmt;

use thiserror::Error;

/// Part of a clear-signed license document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSection {
    Header,
    Claims,
    Signature,
}

impl fmt::Display for DocumentSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Claims => "claims",
            Self::Signature => "signature",
        })
    }
}

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The document lacks a required section.
    #[error("license document is missing its {0} section")]
    MissingSection(DocumentSection),

    /// The claims carry no base64 payload.
    #[error("license document carries no payload")]
    MissingPayload,

    /// The signature packet could not be decoded.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Signing key fingerprint does not match the pinned fingerprint.
    #[error("untrusted signing key: expected fingerprint {expected}, got {actual}")]
    UntrustedKey { expected: String, actual: String },

    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    InvalidSignature,

    /// Payload is not valid base64 or not a license.
    #[error("invalid license payload: {0}")]
    InvalidPayload(String),

    /// License carries no signature.
    #[error("license signature is missing")]
    MissingSignature,

    /// License has expired.
    #[error("license expired at {expired_at} (current time: {now})")]
    Expired { expired_at: String, now: String },

    /// More instances are running than the license allows.
    #[error("instance limit exceeded: {running} running, {max} allowed")]
    InstanceLimitExceeded { max: u32, running: u32 },

    /// Current machine is not in the license's allow list.
    #[error("machine not authorized: {0}")]
    MachineNotAuthorized(String),

    /// No license file in any searched location.
    #[error("license file not found (searched {searched} locations)")]
    NotFound { searched: usize },

    /// Key bytes are not a valid Ed25519 key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Reading the license file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
