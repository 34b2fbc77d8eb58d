//! Seals every artifact of a bundle and writes the manifest.
//!
//! Each artifact entry is replaced by its sealed bytes at the original path
//! and duplicated at `<shadow_prefix><original path>`. Everything else is
//! copied through unchanged. The manifest is written last.
//!
//! Any error aborts the run. Whatever was already written to the sink is
//! incomplete and must be discarded by the caller.

use std::io::{Read, Seek, Write};

use bytelock_crypto::{derive_master_key, seal_with, CipherSuite, MasterKey, Salt, SealedBlob};
use chrono::Utc;
use tracing::{debug, info};

use crate::archive::{ZipBundleReader, ZipBundleWriter};
use crate::config::PipelineConfig;
use crate::entry::{EntrySink, EntrySource};
use crate::manifest::{Manifest, ManifestEntry};
use crate::{BundleError, BundleResult};

/// One sealed artifact and the two places it is written to.
#[derive(Debug, Clone)]
pub struct SealedArtifact {
    pub id: String,
    pub original_path: String,
    pub shadow_path: String,
    pub sealed: SealedBlob,
}

impl SealedArtifact {
    /// `(path, bytes)` pairs to write: original path first, then the shadow copy.
    pub fn outputs(&self) -> [(&str, &[u8]); 2] {
        [
            (self.original_path.as_str(), self.sealed.as_bytes()),
            (self.shadow_path.as_str(), self.sealed.as_bytes()),
        ]
    }

    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            original_path: self.original_path.clone(),
            encrypted_path: self.shadow_path.clone(),
            class_name: self.id.clone(),
        }
    }

    fn write_to<K: EntrySink + ?Sized>(&self, sink: &mut K) -> BundleResult<()> {
        for (path, bytes) in self.outputs() {
            sink.write_file(path, bytes)?;
        }
        Ok(())
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Artifacts sealed. Equals `manifest.total_classes`.
    pub sealed: usize,
    /// Directories and non-artifact entries copied through.
    pub copied: usize,
    /// Artifacts left unsealed because they matched an exclusion pattern.
    /// They are copied through too but counted only here.
    pub excluded: usize,
    pub manifest: Manifest,
}

/// What the pipeline does with one entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryAction {
    /// Seal under the given artifact id.
    Seal(String),
    /// Artifact matching an exclusion pattern.
    Exclude,
    /// Not an artifact.
    Copy,
}

/// Seals bundles according to a [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct EncryptionPipeline {
    config: PipelineConfig,
    suite: CipherSuite,
}

impl EncryptionPipeline {
    pub fn new(config: PipelineConfig) -> BundleResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            suite: CipherSuite::default(),
        })
    }

    #[must_use]
    pub fn with_suite(mut self, suite: CipherSuite) -> Self {
        self.suite = suite;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Whether `name` is a sealable artifact, before exclusions.
    pub fn is_artifact(&self, name: &str) -> bool {
        name.ends_with(&self.config.artifact_suffix)
            && !name.starts_with(&self.config.metadata_prefix)
    }

    /// Whether `name` contains any exclusion pattern.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.config.exclusion_patterns().any(|p| name.contains(p))
    }

    /// Artifact id for an entry name: suffix removed, `/` replaced by `.`.
    pub fn artifact_id(&self, name: &str) -> Option<String> {
        let stem = name.strip_suffix(&self.config.artifact_suffix)?;
        if stem.is_empty() {
            return None;
        }
        Some(stem.replace('/', "."))
    }

    pub fn shadow_path(&self, name: &str) -> String {
        format!("{}{}", self.config.shadow_prefix, name)
    }

    /// Decides what happens to a file entry.
    pub fn classify(&self, name: &str) -> EntryAction {
        if !self.is_artifact(name) {
            return EntryAction::Copy;
        }
        let Some(id) = self.artifact_id(name) else {
            return EntryAction::Copy;
        };
        if self.is_excluded(name) {
            return EntryAction::Exclude;
        }
        EntryAction::Seal(id)
    }

    /// Seals `source` into `sink` with a freshly generated salt.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K, password: &str) -> BundleResult<PipelineReport>
    where
        S: EntrySource + ?Sized,
        K: EntrySink + ?Sized,
    {
        self.run_with_salt(source, sink, password, Salt::generate())
    }

    /// Seals `source` into `sink` with an explicit salt.
    pub fn run_with_salt<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        password: &str,
        salt: Salt,
    ) -> BundleResult<PipelineReport>
    where
        S: EntrySource + ?Sized,
        K: EntrySink + ?Sized,
    {
        let master_key = derive_master_key(password, salt.as_bytes())?;
        let mut manifest = Manifest::new(self.suite, &salt, Utc::now());
        let mut copied = 0;
        let mut excluded = 0;

        info!(suite = %self.suite, "sealing bundle");

        while let Some(entry) = source.next_entry()? {
            if entry.name == self.config.manifest_path {
                return Err(BundleError::AlreadySealed(entry.name));
            }

            if entry.is_dir {
                sink.write_directory(&entry.name)?;
                copied += 1;
                continue;
            }

            match self.classify(&entry.name) {
                EntryAction::Seal(id) => {
                    let artifact = self.seal_artifact(&master_key, id, entry.name, &entry.data)?;
                    if let Err(existing) = manifest.record(artifact.manifest_entry()) {
                        return Err(BundleError::DuplicateArtifact {
                            id: artifact.id,
                            first: existing.original_path.clone(),
                            second: artifact.original_path,
                        });
                    }
                    artifact.write_to(sink)?;
                    debug!(artifact = %artifact.id, path = %artifact.original_path, "sealed");
                }
                EntryAction::Exclude => {
                    sink.write_file(&entry.name, &entry.data)?;
                    excluded += 1;
                    debug!(path = %entry.name, "excluded from sealing");
                }
                EntryAction::Copy => {
                    sink.write_file(&entry.name, &entry.data)?;
                    copied += 1;
                }
            }
        }

        sink.write_file(&self.config.manifest_path, &manifest.to_json_pretty()?)?;

        let sealed = manifest.total_classes;
        info!(sealed, copied, excluded, "bundle sealed");

        Ok(PipelineReport {
            sealed,
            copied,
            excluded,
            manifest,
        })
    }

    /// Reads a zip bundle from `input` and writes the sealed zip to `output`.
    pub fn seal_zip<R, W>(&self, input: R, output: W, password: &str) -> BundleResult<(W, PipelineReport)>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let mut reader = ZipBundleReader::new(input)?;
        let mut writer = ZipBundleWriter::new(output);
        let report = self.run(&mut reader, &mut writer, password)?;
        Ok((writer.finish()?, report))
    }

    fn seal_artifact(
        &self,
        master_key: &MasterKey,
        id: String,
        original_path: String,
        plaintext: &[u8],
    ) -> BundleResult<SealedArtifact> {
        let key = master_key.derive_artifact_key(&id)?;
        let sealed = seal_with(self.suite, plaintext, key.as_bytes())?;
        Ok(SealedArtifact {
            shadow_path: self.shadow_path(&original_path),
            id,
            original_path,
            sealed,
        })
    }
}

impl Default for EncryptionPipeline {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            suite: CipherSuite::default(),
        }
    }
}
