//! Verifies clear-signed license documents and extracts the license.

use std::path::Path;

use tracing::{debug, warn};

use crate::armor::{extract_payload, ClearSignedDocument};
use crate::error::{LicenseError, LicenseResult};
use crate::model::License;
use crate::trust::TrustAnchor;

/// Decodes license documents signed by the key behind a [`TrustAnchor`].
#[derive(Debug, Clone)]
pub struct LicenseCodec {
    anchor: TrustAnchor,
}

impl LicenseCodec {
    pub fn new(anchor: TrustAnchor) -> Self {
        Self { anchor }
    }

    /// Codec for the embedded production key.
    pub fn embedded() -> LicenseResult<Self> {
        Ok(Self::new(TrustAnchor::embedded()?))
    }

    pub fn anchor(&self) -> &TrustAnchor {
        &self.anchor
    }

    /// Parses `document` and verifies its signature over the claims.
    ///
    /// # Errors
    ///
    /// Structural errors from parsing, [`LicenseError::UntrustedKey`] when the
    /// packet names another issuer, [`LicenseError::InvalidSignature`] when
    /// the claims were altered.
    pub fn verify(&self, document: &str) -> LicenseResult<ClearSignedDocument> {
        let doc = ClearSignedDocument::parse(document)?;
        let packet = doc.packet();

        if packet.issuer_fingerprint != self.anchor.fingerprint_bytes() {
            let actual = packet.issuer_fingerprint_hex();
            warn!(issuer = %actual, "license signed by untrusted key");
            return Err(LicenseError::UntrustedKey {
                expected: self.anchor.fingerprint().to_string(),
                actual,
            });
        }

        if let Err(e) = self.anchor.verify(doc.claims().as_bytes(), &packet.signature) {
            warn!("license document signature verification failed");
            return Err(e);
        }

        debug!(issuer = %self.anchor.fingerprint(), "license document signature verified");
        Ok(doc)
    }

    /// Verifies `document` and returns the embedded license JSON.
    pub fn verify_and_extract(&self, document: &str) -> LicenseResult<String> {
        let doc = self.verify(document)?;
        let payload = extract_payload(doc.claims())?;
        String::from_utf8(payload)
            .map_err(|e| LicenseError::InvalidPayload(format!("payload is not UTF-8: {e}")))
    }

    /// Verifies `document` and deserializes the embedded license.
    pub fn decode(&self, document: &str) -> LicenseResult<License> {
        let json = self.verify_and_extract(document)?;
        License::from_json(json.as_bytes())
    }

    /// Reads and decodes a license file.
    pub fn decode_file(&self, path: &Path) -> LicenseResult<License> {
        let document = std::fs::read_to_string(path)?;
        self.decode(&document)
    }
}
