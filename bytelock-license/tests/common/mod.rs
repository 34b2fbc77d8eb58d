//! Shared test helpers for license tests.

#![allow(dead_code)]

use bytelock_license::{
    BindingMode, License, LicenseDraft, LicenseIssuer, LicenseType, LicenseValidator,
    StaticMachineId, TrustAnchor,
};
use chrono::{DateTime, TimeZone, Utc};

pub const MACHINE_ID: &str = "machine-a";

/// Deterministic seed for the test signing key.
pub fn test_seed() -> [u8; 32] {
    [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ]
}

/// Issuer built from [`test_seed`].
pub fn test_issuer() -> LicenseIssuer {
    LicenseIssuer::from_signing_key_bytes(&test_seed())
}

/// A second, unrelated issuer.
pub fn other_issuer() -> LicenseIssuer {
    LicenseIssuer::from_signing_key_bytes(&[0x42; 32])
}

/// Trust anchor pinned to the test issuer.
pub fn test_anchor() -> TrustAnchor {
    test_issuer().trust_anchor().unwrap()
}

/// Validator for the test anchor running on [`MACHINE_ID`].
pub fn test_validator() -> LicenseValidator {
    LicenseValidator::new(test_anchor()).with_machine_identity(StaticMachineId::new(MACHINE_ID))
}

pub fn issued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

pub fn expire_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

/// A standard draft with fixed instants.
pub fn standard_draft() -> LicenseDraft {
    LicenseDraft::new("Acme Corp", LicenseType::Standard)
        .license_id("LIC-0A1B2C3D")
        .issued_at(issued_at())
        .expires_at(expire_at())
        .max_instances(3)
        .features(["core", "export"])
        .binding(BindingMode::Optional, [MACHINE_ID, "machine-b"])
}

/// Issues `draft` with the test issuer and returns the license.
pub fn signed(draft: LicenseDraft) -> License {
    test_issuer().issue(draft).unwrap().license
}

/// Issues `draft` with the test issuer and returns the document text.
pub fn document(draft: LicenseDraft) -> String {
    test_issuer().issue(draft).unwrap().document
}
