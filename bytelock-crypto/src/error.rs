//! Error types for the key hierarchy, cipher and decryption engine.

use thiserror::Error;

/// Result type for key derivation.
pub type KeyDerivationResult<T> = Result<T, KeyDerivationError>;

/// Result type for seal/unseal.
pub type CipherResult<T> = Result<T, CipherError>;

/// Result type for general crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors from password or artifact key derivation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyDerivationError {
    /// Password was empty.
    #[error("key derivation failed: password cannot be empty")]
    EmptyPassword,

    /// Salt shorter than the minimum.
    #[error("key derivation failed: salt must be at least {min} bytes, got {actual}")]
    SaltTooShort { min: usize, actual: usize },

    /// Master key of the wrong size.
    #[error("key derivation failed: master key must be {expected} bytes, got {actual}")]
    InvalidMasterKeyLength { expected: usize, actual: usize },

    /// Artifact identifier was empty.
    #[error("key derivation failed: artifact id cannot be empty")]
    EmptyArtifactId,

    /// HKDF rejected the key material or output length.
    #[error("key derivation failed: {0}")]
    Expand(String),
}

/// Errors from the authenticated cipher.
///
/// Wrong key and tampered data both surface as [`CipherError::Authentication`];
/// the two are not distinguishable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Key of the wrong size.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Sealed blob too short to hold a nonce and tag.
    #[error("malformed sealed blob: expected at least {min} bytes, got {actual}")]
    Malformed { min: usize, actual: usize },

    /// Tag verification failed.
    #[error("decryption failed (wrong key or tampered data)")]
    Authentication,

    /// The AEAD refused to encrypt.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Unknown algorithm identifier.
    #[error("unsupported cipher suite: {0}")]
    UnsupportedSuite(String),
}

/// Failure to decrypt one artifact, with the artifact id attached.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("failed to derive key for artifact {artifact_id}: {source}")]
    KeyDerivation {
        artifact_id: String,
        #[source]
        source: KeyDerivationError,
    },

    #[error("failed to unseal artifact {artifact_id}: {source}")]
    Cipher {
        artifact_id: String,
        #[source]
        source: CipherError,
    },
}

impl DecryptionError {
    /// The artifact that failed to decrypt.
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        match self {
            Self::KeyDerivation { artifact_id, .. } | Self::Cipher { artifact_id, .. } => {
                artifact_id
            }
        }
    }
}

/// Umbrella error for callers that mix derivation, sealing and decryption.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error(transparent)]
    KeyDerivation(#[from] KeyDerivationError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),
}
