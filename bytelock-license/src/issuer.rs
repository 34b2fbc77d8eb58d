//! Offline license issuance.
//!
//! Holds the private signing key, so it belongs in vendor tooling only and
//! never ships with the software that consumes licenses.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::armor::{wrap_payload, ClearSignedDocument, SignaturePacket};
use crate::error::LicenseResult;
use crate::model::{Authorization, BindingMode, License, LicenseType, LICENSE_VERSION};
use crate::trust::{fingerprint, TrustAnchor};

/// A new license id: `LIC-` followed by 8 upper-case hex characters.
#[must_use]
pub fn generate_license_id() -> String {
    let simple = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("LIC-{}", &simple[..8])
}

/// Terms of a license to be issued.
#[derive(Debug, Clone)]
pub struct LicenseDraft {
    issued_to: String,
    license_type: LicenseType,
    license_id: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    expire_at: Option<DateTime<Utc>>,
    authorization: Authorization,
}

impl LicenseDraft {
    pub fn new(issued_to: impl Into<String>, license_type: LicenseType) -> Self {
        Self {
            issued_to: issued_to.into(),
            license_type,
            license_id: None,
            issued_at: None,
            expire_at: None,
            authorization: Authorization::default(),
        }
    }

    /// Uses a fixed id instead of a generated one.
    #[must_use]
    pub fn license_id(mut self, id: impl Into<String>) -> Self {
        self.license_id = Some(id.into());
        self
    }

    /// Issue time; defaults to now.
    #[must_use]
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = Some(at);
        self
    }

    #[must_use]
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expire_at = Some(at);
        self
    }

    /// Expires `days` after the issue time.
    #[must_use]
    pub fn valid_for_days(self, days: i64) -> Self {
        let issued_at = self.issued_at.unwrap_or_else(Utc::now);
        self.issued_at(issued_at)
            .expires_at(issued_at + Duration::days(days))
    }

    #[must_use]
    pub fn max_instances(mut self, max: u32) -> Self {
        self.authorization.max_instances = max;
        self
    }

    #[must_use]
    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorization.features = features.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn binding<I, S>(mut self, mode: BindingMode, machine_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorization.binding_mode = mode;
        self.authorization.allowed_machine_ids = machine_ids.into_iter().map(Into::into).collect();
        self
    }

    fn into_license(self) -> License {
        License {
            version: LICENSE_VERSION.to_string(),
            license_id: self.license_id.unwrap_or_else(generate_license_id),
            license_type: self.license_type,
            issued_to: self.issued_to,
            issued_at: self.issued_at.unwrap_or_else(Utc::now),
            expire_at: self.expire_at,
            authorization: self.authorization,
            signature: None,
        }
    }
}

/// A freshly issued license and its signed document.
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    pub license: License,
    pub document: String,
}

/// Signs licenses with the vendor's Ed25519 key.
pub struct LicenseIssuer {
    signing_key: SigningKey,
}

impl LicenseIssuer {
    /// Builds an issuer from a 32-byte Ed25519 seed.
    pub fn from_signing_key_bytes(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Upper-case hex fingerprint of the public key.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.public_key_bytes())
    }

    /// Trust anchor pinned to this issuer's key.
    pub fn trust_anchor(&self) -> LicenseResult<TrustAnchor> {
        TrustAnchor::pinned(&self.public_key_bytes(), &self.fingerprint())
    }

    /// Fills `license.signature` over its canonical payload.
    pub fn sign_license(&self, license: &mut License) {
        let signature = self.signing_key.sign(license.signing_payload().as_bytes());
        license.signature = Some(BASE64.encode(signature.to_bytes()));
    }

    /// Clear-signs arbitrary claims text.
    #[must_use]
    pub fn clear_sign(&self, claims: &str, created_at: DateTime<Utc>) -> String {
        let signature = self.signing_key.sign(claims.as_bytes());
        let packet = SignaturePacket {
            created_at: created_at.timestamp(),
            issuer_fingerprint: Sha256::digest(self.public_key_bytes()).into(),
            signature: signature.to_bytes(),
        };
        ClearSignedDocument::render(claims, &packet)
    }

    /// Issues a license: signs it, embeds its JSON and clear-signs the claims.
    pub fn issue(&self, draft: LicenseDraft) -> LicenseResult<IssuedLicense> {
        let mut license = draft.into_license();
        self.sign_license(&mut license);

        let claims = wrap_payload(license.to_json()?.as_bytes());
        let document = self.clear_sign(&claims, Utc::now());

        info!(
            license_id = %license.license_id,
            license_type = %license.license_type,
            issued_to = %license.issued_to,
            "license issued"
        );

        Ok(IssuedLicense { license, document })
    }
}

impl std::fmt::Debug for LicenseIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseIssuer")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}
