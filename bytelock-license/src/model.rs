//! License claims and their canonical signing form.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LicenseError, LicenseResult};

/// Current license format version.
pub const LICENSE_VERSION: &str = "1.0";

/// License tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LicenseType {
    Trial,
    Standard,
    Enterprise,
}

impl LicenseType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "TRIAL",
            Self::Standard => "STANDARD",
            Self::Enterprise => "ENTERPRISE",
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly a license is tied to machines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BindingMode {
    /// Runs anywhere.
    #[default]
    None,
    /// Checked only when machine ids are listed.
    Optional,
    /// The current machine must be listed.
    Strict,
}

impl BindingMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Optional => "OPTIONAL",
            Self::Strict => "STRICT",
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a license permits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Maximum concurrent instances; 0 means unlimited.
    #[serde(default)]
    pub max_instances: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub binding_mode: BindingMode,
    #[serde(default)]
    pub allowed_machine_ids: Vec<String>,
}

impl Authorization {
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.max_instances == 0
    }

    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// A license as carried in the signed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub version: String,
    pub license_id: String,
    pub license_type: LicenseType,
    pub issued_to: String,
    pub issued_at: DateTime<Utc>,
    /// `None` never expires.
    #[serde(default)]
    pub expire_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub authorization: Authorization,
    /// Base64 Ed25519 signature over [`License::signing_payload`].
    #[serde(default)]
    pub signature: Option<String>,
}

impl License {
    /// Canonical byte form covered by the license signature.
    ///
    /// Field order is fixed; instants are RFC 3339 UTC with a `Z` suffix and
    /// only as much sub-second precision as they carry. An absent expiry is
    /// an empty value.
    #[must_use]
    pub fn signing_payload(&self) -> String {
        let auth = &self.authorization;
        format!(
            "version={}|licenseId={}|licenseType={}|issuedTo={}|issuedAt={}|expireAt={}|maxInstances={}|features={}|bindingMode={}|allowedMachineIds={}",
            self.version,
            self.license_id,
            self.license_type,
            self.issued_to,
            format_instant(&self.issued_at),
            self.expire_at.as_ref().map(format_instant).unwrap_or_default(),
            auth.max_instances,
            auth.features.join(","),
            auth.binding_mode,
            auth.allowed_machine_ids.join(","),
        )
    }

    /// Whether the license has expired at `now`. Expiry is exclusive: a
    /// license is still valid at exactly `expire_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.is_some_and(|expire_at| now > expire_at)
    }

    #[must_use]
    pub fn is_perpetual(&self) -> bool {
        self.expire_at.is_none()
    }

    pub fn to_json(&self) -> LicenseResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses license JSON, reporting any failure as an invalid payload.
    pub fn from_json(bytes: &[u8]) -> LicenseResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| LicenseError::InvalidPayload(format!("invalid license JSON: {e}")))
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "License{{licenseId='{}', type={}, issuedTo='{}', expireAt={}}}",
            self.license_id,
            self.license_type,
            self.issued_to,
            self.expire_at
                .as_ref()
                .map_or_else(|| "never".to_string(), format_instant)
        )
    }
}

pub(crate) fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn license() -> License {
        License {
            version: LICENSE_VERSION.into(),
            license_id: "LIC-0A1B2C3D".into(),
            license_type: LicenseType::Standard,
            issued_to: "Acme Corp".into(),
            issued_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            expire_at: Some(Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 0).unwrap()),
            authorization: Authorization {
                max_instances: 5,
                features: vec!["core".into(), "export".into()],
                binding_mode: BindingMode::Optional,
                allowed_machine_ids: vec!["m1".into(), "m2".into()],
            },
            signature: None,
        }
    }

    #[test]
    fn signing_payload_is_canonical() {
        assert_eq!(
            license().signing_payload(),
            "version=1.0|licenseId=LIC-0A1B2C3D|licenseType=STANDARD|issuedTo=Acme Corp|\
             issuedAt=2025-01-01T00:00:00Z|expireAt=2026-01-01T12:30:00Z|maxInstances=5|\
             features=core,export|bindingMode=OPTIONAL|allowedMachineIds=m1,m2"
        );
    }

    #[test]
    fn signing_payload_with_no_expiry_and_millis() {
        let mut l = license();
        l.expire_at = None;
        l.issued_at = Utc.timestamp_millis_opt(1_700_000_000_250).unwrap();
        l.authorization = Authorization::default();
        assert_eq!(
            l.signing_payload(),
            "version=1.0|licenseId=LIC-0A1B2C3D|licenseType=STANDARD|issuedTo=Acme Corp|\
             issuedAt=2023-11-14T22:13:20.250Z|expireAt=|maxInstances=0|features=|\
             bindingMode=NONE|allowedMachineIds="
        );
    }

    #[test]
    fn signature_field_is_not_signed() {
        let mut l = license();
        let before = l.signing_payload();
        l.signature = Some("abc".into());
        assert_eq!(l.signing_payload(), before);
    }

    #[test]
    fn json_uses_camel_case_and_upper_enums() {
        let json: serde_json::Value = serde_json::from_str(&license().to_json().unwrap()).unwrap();
        assert_eq!(json["licenseId"], "LIC-0A1B2C3D");
        assert_eq!(json["licenseType"], "STANDARD");
        assert_eq!(json["authorization"]["bindingMode"], "OPTIONAL");
        assert_eq!(json["authorization"]["maxInstances"], 5);
        assert_eq!(json["authorization"]["allowedMachineIds"][1], "m2");
    }

    #[test]
    fn json_roundtrip() {
        let l = license();
        assert_eq!(License::from_json(l.to_json().unwrap().as_bytes()).unwrap(), l);
    }

    #[test]
    fn bad_json_is_invalid_payload() {
        assert!(matches!(
            License::from_json(b"{}"),
            Err(LicenseError::InvalidPayload(_))
        ));
    }

    #[test]
    fn expiry_is_exclusive() {
        let l = license();
        let expire_at = l.expire_at.unwrap();
        assert!(!l.is_expired_at(expire_at));
        assert!(l.is_expired_at(expire_at + chrono::Duration::nanoseconds(1)));
    }
}
