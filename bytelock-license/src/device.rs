//! Machine identity for license binding.
//!
//! A license's `allowedMachineIds` are compared against whatever a
//! [`MachineIdentity`] reports. [`DeviceFingerprint`] is the default: a hash
//! over host identifiers that survives reboots. Hosts that track identity
//! themselves can pass a [`StaticMachineId`] instead.

use std::env;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Separator between identifier components before hashing.
const COMPONENT_SEPARATOR: &str = "|";

/// Bytes of the SHA-256 digest kept in a fingerprint id.
const FINGERPRINT_BYTES: usize = 16;

/// Source of the id matched against a license's allowed machines.
pub trait MachineIdentity {
    fn machine_id(&self) -> String;
}

/// A fixed machine id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMachineId(pub String);

impl StaticMachineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl MachineIdentity for StaticMachineId {
    fn machine_id(&self) -> String {
        self.0.clone()
    }
}

/// Hash of this host's identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    /// Base64 of the leading [`FINGERPRINT_BYTES`] of the digest.
    id: String,
    generated_at: DateTime<Utc>,
}

impl DeviceFingerprint {
    /// Fingerprints the current host.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_components(&host_components())
    }

    /// Fingerprint over explicit identifier components, in order.
    #[must_use]
    pub fn from_components(components: &[String]) -> Self {
        let digest = Sha256::digest(components.join(COMPONENT_SEPARATOR).as_bytes());
        Self {
            id: BASE64.encode(&digest[..FINGERPRINT_BYTES]),
            generated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Whether the current host still produces this id.
    #[must_use]
    pub fn matches_current(&self) -> bool {
        Self::generate().id == self.id
    }
}

impl MachineIdentity for DeviceFingerprint {
    fn machine_id(&self) -> String {
        self.id.clone()
    }
}

/// Host identifiers in hashing order: OS, architecture, hostname, platform
/// machine id (when available) and login name (when set).
fn host_components() -> Vec<String> {
    let user = env::var("USER").or_else(|_| env::var("USERNAME")).ok();

    [
        Some(env::consts::OS.to_string()),
        Some(env::consts::ARCH.to_string()),
        Some(host_name()),
        platform_machine_id(),
        user,
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(target_os = "linux")]
fn platform_machine_id() -> Option<String> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .find_map(|path| std::fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

#[cfg(target_os = "macos")]
fn platform_machine_id() -> Option<String> {
    let output = std::process::Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()?;
    platform_uuid_from_ioreg(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn platform_machine_id() -> Option<String> {
    None
}

/// Extracts the value of `"IOPlatformUUID" = "<uuid>"` from `ioreg` output.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn platform_uuid_from_ioreg(output: &str) -> Option<String> {
    let line = output.lines().find(|l| l.contains("\"IOPlatformUUID\""))?;
    let (_, value) = line.split_once('=')?;
    let uuid = value.trim().trim_matches('"');
    (!uuid.is_empty()).then(|| uuid.to_string())
}
