//! Sealing manifest (`manifest.json`) written into every sealed bundle.
//!
//! The manifest records the salt and cipher suite needed to rebuild the
//! master key at load time, plus one entry per sealed artifact. Keys are
//! ordered so the JSON is deterministic for a given set of artifacts.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytelock_crypto::{CipherSuite, Salt, MIN_SALT_SIZE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BundleError, BundleResult};

/// Manifest format version.
pub const MANIFEST_VERSION: &str = "1.0";

/// Top-level manifest of a sealed bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Format version, always [`MANIFEST_VERSION`].
    pub version: String,
    /// Cipher suite id (e.g. "AES-256-GCM").
    pub algorithm: String,
    /// Base64 (standard alphabet) of the key derivation salt.
    pub salt: String,
    /// Number of sealed artifacts. Equals `encrypted_classes.len()`.
    pub total_classes: usize,
    /// Sealing time in milliseconds since the Unix epoch.
    pub encrypted_at: i64,
    /// Sealed artifacts keyed by artifact id.
    pub encrypted_classes: BTreeMap<String, ManifestEntry>,
}

/// Where one sealed artifact lives inside the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Path of the artifact in the input bundle; holds sealed bytes afterwards.
    pub original_path: String,
    /// Shadow copy of the sealed bytes under the metadata prefix.
    pub encrypted_path: String,
    /// Artifact id (dotted name).
    pub class_name: String,
}

impl Manifest {
    /// Starts an empty manifest for a sealing run.
    pub fn new(suite: CipherSuite, salt: &Salt, encrypted_at: DateTime<Utc>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            algorithm: suite.id().to_string(),
            salt: BASE64.encode(salt.as_bytes()),
            total_classes: 0,
            encrypted_at: encrypted_at.timestamp_millis(),
            encrypted_classes: BTreeMap::new(),
        }
    }

    /// Parses and validates manifest JSON.
    pub fn from_json(bytes: &[u8]) -> BundleResult<Self> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn to_json_pretty(&self) -> BundleResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Checks version, suite, salt and that the count matches the entries.
    pub fn validate(&self) -> BundleResult<()> {
        if self.version != MANIFEST_VERSION {
            return Err(BundleError::InvalidManifest(format!(
                "unsupported version {}",
                self.version
            )));
        }
        self.suite()?;
        self.salt_bytes()?;
        if self.total_classes != self.encrypted_classes.len() {
            return Err(BundleError::InvalidManifest(format!(
                "totalClasses is {} but {} classes are listed",
                self.total_classes,
                self.encrypted_classes.len()
            )));
        }
        for (id, entry) in &self.encrypted_classes {
            if entry.class_name != *id {
                return Err(BundleError::InvalidManifest(format!(
                    "entry {id} names class {}",
                    entry.class_name
                )));
            }
        }
        Ok(())
    }

    /// Decoded salt bytes.
    pub fn salt_bytes(&self) -> BundleResult<Vec<u8>> {
        let bytes = BASE64
            .decode(&self.salt)
            .map_err(|e| BundleError::InvalidManifest(format!("salt is not base64: {e}")))?;
        if bytes.len() < MIN_SALT_SIZE {
            return Err(BundleError::InvalidManifest(format!(
                "salt must be at least {MIN_SALT_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Cipher suite named by `algorithm`.
    pub fn suite(&self) -> BundleResult<CipherSuite> {
        self.algorithm
            .parse()
            .map_err(|e: bytelock_crypto::CipherError| BundleError::InvalidManifest(e.to_string()))
    }

    /// Sealing time, if `encrypted_at` is within chrono's range.
    pub fn encrypted_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.encrypted_at)
    }

    pub fn entry(&self, id: &str) -> Option<&ManifestEntry> {
        self.encrypted_classes.get(id)
    }

    pub fn is_sealed(&self, id: &str) -> bool {
        self.encrypted_classes.contains_key(id)
    }

    /// Sealed artifact ids in sorted order.
    pub fn artifact_ids(&self) -> impl Iterator<Item = &str> {
        self.encrypted_classes.keys().map(String::as_str)
    }

    /// Adds an entry, keeping `total_classes` in step. Returns the entry
    /// already recorded under the same id, leaving it in place.
    pub(crate) fn record(&mut self, entry: ManifestEntry) -> Result<(), &ManifestEntry> {
        use std::collections::btree_map::Entry;

        match self.encrypted_classes.entry(entry.class_name.clone()) {
            Entry::Occupied(existing) => Err(existing.into_mut()),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                self.total_classes += 1;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manifest() -> Manifest {
        let salt = Salt::from_bytes(vec![1u8; 32]).unwrap();
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        Manifest::new(CipherSuite::Aes256Gcm, &salt, at)
    }

    fn entry(id: &str) -> ManifestEntry {
        let path = format!("{}.class", id.replace('.', "/"));
        ManifestEntry {
            encrypted_path: format!("META-INF/.sealed/{path}"),
            original_path: path,
            class_name: id.to_string(),
        }
    }

    #[test]
    fn json_uses_wire_field_names() {
        let mut m = manifest();
        m.record(entry("com.example.Main")).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&m.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["algorithm"], "AES-256-GCM");
        assert_eq!(json["totalClasses"], 1);
        assert_eq!(json["encryptedAt"], 1_700_000_000_123i64);
        let cls = &json["encryptedClasses"]["com.example.Main"];
        assert_eq!(cls["originalPath"], "com/example/Main.class");
        assert_eq!(cls["encryptedPath"], "META-INF/.sealed/com/example/Main.class");
        assert_eq!(cls["className"], "com.example.Main");
    }

    #[test]
    fn json_roundtrip() {
        let mut m = manifest();
        m.record(entry("a.B")).unwrap();
        m.record(entry("a.A")).unwrap();
        let parsed = Manifest::from_json(&m.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, m);
        assert_eq!(parsed.artifact_ids().collect::<Vec<_>>(), vec!["a.A", "a.B"]);
    }

    #[test]
    fn record_rejects_duplicate_ids() {
        let mut m = manifest();
        m.record(entry("a.A")).unwrap();
        let existing = m.record(entry("a.A")).unwrap_err();
        assert_eq!(existing.original_path, "a/A.class");
        assert_eq!(m.total_classes, 1);
    }

    #[test]
    fn count_mismatch_is_invalid() {
        let mut m = manifest();
        m.record(entry("a.A")).unwrap();
        m.total_classes = 2;
        assert!(matches!(m.validate(), Err(BundleError::InvalidManifest(_))));
    }

    #[test]
    fn bad_salt_and_suite_are_invalid() {
        let mut m = manifest();
        m.salt = "not base64!".into();
        assert!(m.validate().is_err());

        let mut m = manifest();
        m.salt = BASE64.encode([0u8; 4]);
        assert!(m.validate().is_err());

        let mut m = manifest();
        m.algorithm = "DES".into();
        assert!(m.validate().is_err());
    }

    #[test]
    fn encrypted_at_converts_back() {
        let m = manifest();
        assert_eq!(m.encrypted_at().unwrap().timestamp_millis(), 1_700_000_000_123);
    }
}
