//! Policy checks on a decoded license.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. signature over the canonical payload
//! 2. expiry
//! 3. running-instance limit
//! 4. machine binding

use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::device::{DeviceFingerprint, MachineIdentity};
use crate::error::{LicenseError, LicenseResult};
use crate::model::{format_instant, BindingMode, License};
use crate::trust::TrustAnchor;

/// Validates licenses against a trust anchor and the current host.
pub struct LicenseValidator {
    anchor: TrustAnchor,
    machine: Box<dyn MachineIdentity + Send + Sync>,
    running_instances: u32,
}

impl LicenseValidator {
    /// Validator that identifies the host by its [`DeviceFingerprint`] and
    /// assumes a single running instance.
    pub fn new(anchor: TrustAnchor) -> Self {
        Self {
            anchor,
            machine: Box::new(DeviceFingerprint::generate()),
            running_instances: 1,
        }
    }

    #[must_use]
    pub fn with_machine_identity(mut self, machine: impl MachineIdentity + Send + Sync + 'static) -> Self {
        self.machine = Box::new(machine);
        self
    }

    /// Number of instances currently running, as counted by the host.
    #[must_use]
    pub fn with_running_instances(mut self, count: u32) -> Self {
        self.running_instances = count;
        self
    }

    pub fn anchor(&self) -> &TrustAnchor {
        &self.anchor
    }

    /// Validates `license` at the current time.
    pub fn validate(&self, license: &License) -> LicenseResult<()> {
        self.validate_at(license, Utc::now())
    }

    /// Validates `license` as of `now`.
    pub fn validate_at(&self, license: &License, now: DateTime<Utc>) -> LicenseResult<()> {
        let result = self.run_checks(license, now);
        match &result {
            Ok(()) => info!(
                license_id = %license.license_id,
                license_type = %license.license_type,
                "license accepted"
            ),
            Err(e) => warn!(license_id = %license.license_id, error = %e, "license rejected"),
        }
        result
    }

    /// `true` when [`Self::validate`] succeeds.
    #[must_use]
    pub fn is_valid(&self, license: &License) -> bool {
        self.validate(license).is_ok()
    }

    /// See [`describe`].
    #[must_use]
    pub fn describe(&self, license: &License) -> String {
        describe(license)
    }

    fn run_checks(&self, license: &License, now: DateTime<Utc>) -> LicenseResult<()> {
        self.verify_signature(license)?;
        verify_expiration(license, now)?;
        self.verify_instances(license)?;
        self.verify_machine_binding(license)
    }

    fn verify_signature(&self, license: &License) -> LicenseResult<()> {
        let encoded = license
            .signature
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(LicenseError::MissingSignature)?;
        let signature = BASE64
            .decode(encoded)
            .map_err(|_| LicenseError::InvalidSignature)?;
        self.anchor
            .verify(license.signing_payload().as_bytes(), &signature)
    }

    fn verify_instances(&self, license: &License) -> LicenseResult<()> {
        let max = license.authorization.max_instances;
        if max > 0 && self.running_instances > max {
            return Err(LicenseError::InstanceLimitExceeded {
                max,
                running: self.running_instances,
            });
        }
        Ok(())
    }

    fn verify_machine_binding(&self, license: &License) -> LicenseResult<()> {
        let auth = &license.authorization;
        if auth.binding_mode == BindingMode::None {
            return Ok(());
        }

        if auth.allowed_machine_ids.is_empty() {
            return match auth.binding_mode {
                BindingMode::Strict => Err(LicenseError::MachineNotAuthorized(
                    "strict binding with no authorized machines".into(),
                )),
                _ => Ok(()),
            };
        }

        let current = self.machine.machine_id();
        if auth.allowed_machine_ids.iter().any(|id| *id == current) {
            Ok(())
        } else {
            Err(LicenseError::MachineNotAuthorized(current))
        }
    }
}

impl std::fmt::Debug for LicenseValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseValidator")
            .field("anchor", &self.anchor.fingerprint())
            .field("running_instances", &self.running_instances)
            .finish_non_exhaustive()
    }
}

fn verify_expiration(license: &License, now: DateTime<Utc>) -> LicenseResult<()> {
    match license.expire_at {
        Some(expire_at) if now > expire_at => Err(LicenseError::Expired {
            expired_at: format_instant(&expire_at),
            now: format_instant(&now),
        }),
        _ => Ok(()),
    }
}

/// Human-readable summary of a license, for logs and diagnostics.
#[must_use]
pub fn describe(license: &License) -> String {
    let auth = &license.authorization;
    let mut out = String::from("License Information:\n");
    let _ = writeln!(out, "  - License ID: {}", license.license_id);
    let _ = writeln!(out, "  - Type: {}", license.license_type);
    let _ = writeln!(out, "  - Issued to: {}", license.issued_to);
    let _ = writeln!(out, "  - Issued at: {}", format_instant(&license.issued_at));
    let _ = writeln!(
        out,
        "  - Expires at: {}",
        license
            .expire_at
            .as_ref()
            .map_or_else(|| "Never".to_string(), format_instant)
    );
    if auth.is_unlimited() {
        out.push_str("  - Max instances: Unlimited\n");
    } else {
        let _ = writeln!(out, "  - Max instances: {}", auth.max_instances);
    }
    if !auth.features.is_empty() {
        let _ = writeln!(out, "  - Features: {}", auth.features.join(", "));
    }
    let _ = writeln!(out, "  - Binding mode: {}", auth.binding_mode);
    out
}
