//! Cryptographic core for bytelock.
//!
//! Two-tier key hierarchy plus an AEAD cipher:
//!
//! 1. Master key: PBKDF2-HMAC-SHA256 over the packaging password and a
//!    per-bundle salt
//! 2. Artifact key: HMAC-SHA256 of the artifact id under the master key
//!
//! Artifacts are sealed as `nonce || ciphertext || tag`. At load time a
//! [`DecryptionEngine`] recomputes artifact keys from the master key and keeps
//! recently decrypted artifacts in a bounded LRU cache.

mod cipher;
mod engine;
mod error;
mod key;

pub use cipher::{
    generate_key, seal, seal_with, unseal, unseal_with, CipherSuite, SealedBlob,
    MIN_SEALED_SIZE, NONCE_SIZE, TAG_SIZE,
};
pub use engine::{DecryptionEngine, DEFAULT_CACHE_CAPACITY};
pub use error::{
    CipherError, CipherResult, CryptoError, CryptoResult, DecryptionError, KeyDerivationError,
    KeyDerivationResult,
};
pub use key::{
    derive_artifact_key, derive_master_key, ArtifactKey, MasterKey, Salt, KEY_SIZE,
    MIN_SALT_SIZE, PBKDF2_ITERATIONS, SALT_SIZE,
};
