//! Pipeline layout configuration, read from `bytelock.toml`.
//!
//! ```toml
//! [pipeline]
//! artifact-suffix = ".class"
//! metadata-prefix = "META-INF/"
//! shadow-prefix = "META-INF/.sealed/"
//! manifest-path = "META-INF/.bytelock/manifest.json"
//! exclude = ["com/example/generated/"]
//! cache-capacity = 1000
//! ```

use std::path::Path;

use bytelock_crypto::DEFAULT_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{BundleError, BundleResult};

pub const DEFAULT_ARTIFACT_SUFFIX: &str = ".class";
pub const DEFAULT_METADATA_PREFIX: &str = "META-INF/";
pub const DEFAULT_SHADOW_PREFIX: &str = "META-INF/.sealed/";
pub const DEFAULT_MANIFEST_PATH: &str = "META-INF/.bytelock/manifest.json";

/// Where artifacts, shadow copies and the manifest live inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Entry name suffix that marks a sealable artifact.
    #[serde(default = "default_artifact_suffix")]
    pub artifact_suffix: String,
    /// Entries under this prefix are never sealed.
    #[serde(default = "default_metadata_prefix")]
    pub metadata_prefix: String,
    /// Sealed shadow copies are written at `<shadow_prefix><original path>`.
    #[serde(default = "default_shadow_prefix")]
    pub shadow_prefix: String,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    /// Substrings of entry names to leave unsealed.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Decrypted artifacts kept in memory by the loader.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_artifact_suffix() -> String {
    DEFAULT_ARTIFACT_SUFFIX.to_string()
}

fn default_metadata_prefix() -> String {
    DEFAULT_METADATA_PREFIX.to_string()
}

fn default_shadow_prefix() -> String {
    DEFAULT_SHADOW_PREFIX.to_string()
}

fn default_manifest_path() -> String {
    DEFAULT_MANIFEST_PATH.to_string()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_suffix: default_artifact_suffix(),
            metadata_prefix: default_metadata_prefix(),
            shadow_prefix: default_shadow_prefix(),
            manifest_path: default_manifest_path(),
            exclude: Vec::new(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    pipeline: PipelineConfig,
}

impl PipelineConfig {
    /// Parses the `[pipeline]` table of a TOML document and validates it.
    pub fn from_toml_str(contents: &str) -> BundleResult<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        file.pipeline.validate()?;
        Ok(file.pipeline)
    }

    /// Loads configuration from an explicit path. Errors propagate.
    pub fn load_from(path: &Path) -> BundleResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded pipeline config from {:?}", path);
        Ok(config)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file is missing or unusable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No pipeline config at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load pipeline config {:?}: {}. Falling back to defaults.",
                    path, e
                );
                Self::default()
            }
        }
    }

    /// Adds exclusion patterns.
    #[must_use]
    pub fn with_exclusions<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Trimmed, non-empty exclusion patterns.
    pub fn exclusion_patterns(&self) -> impl Iterator<Item = &str> {
        self.exclude
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
    }

    /// Rejects layouts where reserved entries could be mistaken for artifacts.
    pub fn validate(&self) -> BundleResult<()> {
        if self.artifact_suffix.is_empty() {
            return Err(BundleError::Config("artifact-suffix must not be empty".into()));
        }
        if self.metadata_prefix.is_empty() {
            return Err(BundleError::Config("metadata-prefix must not be empty".into()));
        }
        if self.manifest_path.is_empty() {
            return Err(BundleError::Config("manifest-path must not be empty".into()));
        }
        if !self.manifest_path.starts_with(&self.metadata_prefix) {
            return Err(BundleError::Config(format!(
                "manifest-path {} must be under metadata-prefix {}",
                self.manifest_path, self.metadata_prefix
            )));
        }
        if self.shadow_prefix.is_empty() || !self.shadow_prefix.starts_with(&self.metadata_prefix) {
            return Err(BundleError::Config(format!(
                "shadow-prefix {} must be under metadata-prefix {}",
                self.shadow_prefix, self.metadata_prefix
            )));
        }
        Ok(())
    }
}
