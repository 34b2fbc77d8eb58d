//! Key hierarchy: password -> master key -> per-artifact keys.
//!
//! The master key is PBKDF2-HMAC-SHA256 over the password and a per-bundle
//! salt with a fixed work factor. Artifact keys are
//! HKDF-SHA256-Expand of the artifact id with the master key as PRK. One
//! output block is `HMAC-SHA256(master_key, artifact_id || 0x01)`, so each
//! artifact gets an independent key that the load path can recompute from
//! the master key alone.

use crate::error::{KeyDerivationError, KeyDerivationResult};
use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of master and artifact keys in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of freshly generated salts in bytes.
pub const SALT_SIZE: usize = 32;

/// Shortest salt accepted for derivation.
pub const MIN_SALT_SIZE: usize = 16;

/// PBKDF2 iteration count. Changing this breaks every existing bundle.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Password-derived master secret. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Derives the key for one artifact. See [`derive_artifact_key`].
    pub fn derive_artifact_key(&self, artifact_id: &str) -> KeyDerivationResult<ArtifactKey> {
        derive_artifact_key(&self.bytes, artifact_id)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Key for a single artifact. Recomputed on demand, never stored.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ArtifactKey {
    bytes: [u8; KEY_SIZE],
}

impl ArtifactKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Salt for master key derivation. Not secret; stored in the manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt {
    bytes: Vec<u8>,
}

impl Salt {
    /// Generates a random [`SALT_SIZE`]-byte salt from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Wraps existing salt bytes, e.g. read back from a manifest.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> KeyDerivationResult<Self> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SALT_SIZE {
            return Err(KeyDerivationError::SaltTooShort {
                min: MIN_SALT_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// Returns the salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Derives the master key from a password and salt.
///
/// Deterministic: the same pair always yields the same key, which is what
/// lets the load path reproduce the packaging-time key.
///
/// # Errors
///
/// [`KeyDerivationError::EmptyPassword`] or [`KeyDerivationError::SaltTooShort`].
pub fn derive_master_key(password: &str, salt: &[u8]) -> KeyDerivationResult<MasterKey> {
    if password.is_empty() {
        return Err(KeyDerivationError::EmptyPassword);
    }
    if salt.len() < MIN_SALT_SIZE {
        return Err(KeyDerivationError::SaltTooShort {
            min: MIN_SALT_SIZE,
            actual: salt.len(),
        });
    }

    let mut key_bytes = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut *key_bytes);

    Ok(MasterKey::from_bytes(*key_bytes))
}

/// Derives the key for `artifact_id` from a 32-byte master key.
///
/// # Errors
///
/// [`KeyDerivationError::InvalidMasterKeyLength`] or
/// [`KeyDerivationError::EmptyArtifactId`].
pub fn derive_artifact_key(master_key: &[u8], artifact_id: &str) -> KeyDerivationResult<ArtifactKey> {
    if master_key.len() != KEY_SIZE {
        return Err(KeyDerivationError::InvalidMasterKeyLength {
            expected: KEY_SIZE,
            actual: master_key.len(),
        });
    }
    if artifact_id.is_empty() {
        return Err(KeyDerivationError::EmptyArtifactId);
    }

    let hk = Hkdf::<Sha256>::from_prk(master_key)
        .map_err(|e| KeyDerivationError::Expand(e.to_string()))?;
    let mut key_bytes = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(artifact_id.as_bytes(), &mut *key_bytes)
        .map_err(|e| KeyDerivationError::Expand(e.to_string()))?;
    Ok(ArtifactKey::from_bytes(*key_bytes))
}
