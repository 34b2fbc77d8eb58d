//! The trusted license-signing key and its pinned fingerprint.
//!
//! A [`TrustAnchor`] is built once, checked against the pin, and handed to the
//! codec and the validator. A key whose fingerprint does not match the pin
//! never becomes an anchor.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::{LicenseError, LicenseResult};

/// Embedded Ed25519 public key for production license verification (32 bytes).
const LICENSE_PUBLIC_KEY: [u8; 32] = [
    232, 218, 42, 233, 223, 4, 110, 157, 88, 248, 129, 198, 88, 178, 195, 239, 232, 151, 29, 19,
    234, 108, 225, 209, 221, 249, 174, 44, 55, 195, 245, 165,
];

/// Pinned fingerprint of [`LICENSE_PUBLIC_KEY`].
pub const LICENSE_KEY_FINGERPRINT: &str =
    "8BF9AF257C97F8C3AC3D8DFB8B2A5594018E9C4C55B85ABC0FD6371F86E7D9A5";

/// Upper-case hex SHA-256 of a 32-byte Ed25519 public key.
#[must_use]
pub fn fingerprint(public_key: &[u8; 32]) -> String {
    hex::encode_upper(Sha256::digest(public_key))
}

/// A verified, pinned license-signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    verifying_key: VerifyingKey,
    fingerprint: String,
}

impl TrustAnchor {
    /// Builds an anchor from raw public key bytes, failing closed unless the
    /// key's fingerprint equals `expected_fingerprint` (case-insensitive).
    pub fn pinned(public_key: &[u8; 32], expected_fingerprint: &str) -> LicenseResult<Self> {
        let actual = fingerprint(public_key);
        if !actual.eq_ignore_ascii_case(expected_fingerprint.trim()) {
            return Err(LicenseError::UntrustedKey {
                expected: expected_fingerprint.trim().to_ascii_uppercase(),
                actual,
            });
        }

        let verifying_key = VerifyingKey::from_bytes(public_key)
            .map_err(|e| LicenseError::InvalidKey(e.to_string()))?;

        Ok(Self {
            verifying_key,
            fingerprint: actual,
        })
    }

    /// The anchor for the key compiled into this crate.
    pub fn embedded() -> LicenseResult<Self> {
        Self::pinned(&LICENSE_PUBLIC_KEY, LICENSE_KEY_FINGERPRINT)
    }

    #[must_use]
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Upper-case hex fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Raw SHA-256 fingerprint bytes.
    #[must_use]
    pub fn fingerprint_bytes(&self) -> [u8; 32] {
        Sha256::digest(self.verifying_key.as_bytes()).into()
    }

    /// Verifies an Ed25519 signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> LicenseResult<()> {
        let signature =
            Signature::from_slice(signature).map_err(|_| LicenseError::InvalidSignature)?;
        self.verifying_key
            .verify(message, &signature)
            .map_err(|_| LicenseError::InvalidSignature)
    }
}
