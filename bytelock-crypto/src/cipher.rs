//! Artifact sealing with an AEAD cipher.
//!
//! Wire format of a sealed artifact: `nonce(12) || ciphertext || tag(16)`.
//! AES-256-GCM is the default suite; ChaCha20-Poly1305 shares the same key,
//! nonce and tag sizes, so a blob's layout does not depend on the suite.

use crate::error::{CipherError, CipherResult};
use crate::key::KEY_SIZE;
use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Size of nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Shortest well-formed sealed blob (empty plaintext).
pub const MIN_SEALED_SIZE: usize = NONCE_SIZE + TAG_SIZE;

/// AEAD algorithm used to seal artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    #[default]
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl CipherSuite {
    /// Identifier recorded in the bundle manifest.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "AES-256-GCM",
            Self::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }

    fn encrypt(&self, key: &[u8], nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let sealed = match self {
            Self::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map_err(|_| invalid_key(key))?
                .encrypt(nonce, plaintext),
            Self::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
                .map_err(|_| invalid_key(key))?
                .encrypt(nonce, plaintext),
        };
        sealed.map_err(|e| CipherError::Encryption(e.to_string()))
    }

    fn decrypt(&self, key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let opened = match self {
            Self::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map_err(|_| invalid_key(key))?
                .decrypt(nonce, ciphertext),
            Self::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
                .map_err(|_| invalid_key(key))?
                .decrypt(nonce, ciphertext),
        };
        opened.map_err(|_| CipherError::Authentication)
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CipherSuite {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AES-256-GCM" => Ok(Self::Aes256Gcm),
            "ChaCha20-Poly1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(CipherError::UnsupportedSuite(other.to_string())),
        }
    }
}

/// A sealed artifact: `nonce || ciphertext || tag` as one buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedBlob {
    bytes: Vec<u8>,
}

impl SealedBlob {
    /// Wraps raw sealed bytes, rejecting anything shorter than nonce + tag.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> CipherResult<Self> {
        let bytes = bytes.into();
        check_len(&bytes)?;
        Ok(Self { bytes })
    }

    /// The nonce prefix.
    pub fn nonce(&self) -> &[u8] {
        &self.bytes[..NONCE_SIZE]
    }

    /// Everything after the nonce (ciphertext with trailing tag).
    pub fn ciphertext_and_tag(&self) -> &[u8] {
        &self.bytes[NONCE_SIZE..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total length including nonce and tag.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a sealed blob carries at least a nonce and a tag.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SealedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedBlob")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl AsRef<[u8]> for SealedBlob {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Seals `plaintext` under `key` with the default suite.
///
/// A fresh random nonce is drawn for every call.
pub fn seal(plaintext: &[u8], key: &[u8]) -> CipherResult<SealedBlob> {
    seal_with(CipherSuite::default(), plaintext, key)
}

/// Seals `plaintext` under `key` with an explicit suite.
pub fn seal_with(suite: CipherSuite, plaintext: &[u8], key: &[u8]) -> CipherResult<SealedBlob> {
    check_key(key)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let ciphertext = suite.encrypt(key, &nonce, plaintext)?;

    let mut bytes = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    bytes.extend_from_slice(&nonce);
    bytes.extend_from_slice(&ciphertext);
    Ok(SealedBlob { bytes })
}

/// Opens a sealed blob with the default suite.
///
/// # Errors
///
/// [`CipherError::Malformed`] for blobs shorter than nonce + tag,
/// [`CipherError::InvalidKeyLength`] for a bad key, and
/// [`CipherError::Authentication`] for a wrong key or tampered bytes.
pub fn unseal(blob: &[u8], key: &[u8]) -> CipherResult<Vec<u8>> {
    unseal_with(CipherSuite::default(), blob, key)
}

/// Opens a sealed blob with an explicit suite.
pub fn unseal_with(suite: CipherSuite, blob: &[u8], key: &[u8]) -> CipherResult<Vec<u8>> {
    check_len(blob)?;
    check_key(key)?;
    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    suite.decrypt(key, nonce, ciphertext)
}

/// Generates a random 256-bit key for ad hoc use outside the derivation chain.
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    rand::rngs::OsRng.fill_bytes(&mut *key);
    key
}

fn check_key(key: &[u8]) -> CipherResult<()> {
    if key.len() != KEY_SIZE {
        return Err(invalid_key(key));
    }
    Ok(())
}

fn check_len(blob: &[u8]) -> CipherResult<()> {
    if blob.len() < MIN_SEALED_SIZE {
        return Err(CipherError::Malformed {
            min: MIN_SEALED_SIZE,
            actual: blob.len(),
        });
    }
    Ok(())
}

fn invalid_key(key: &[u8]) -> CipherError {
    CipherError::InvalidKeyLength {
        expected: KEY_SIZE,
        actual: key.len(),
    }
}
