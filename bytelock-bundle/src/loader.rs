//! Load-time access to a sealed bundle.
//!
//! Reads the manifest, rebuilds the master key from its salt and decrypts
//! artifacts on request. Bytes handed to [`SealedBundle::decrypt`] by an
//! interception layer are passed to the engine unmodified.

use std::sync::Arc;

use bytelock_crypto::{derive_master_key, DecryptionEngine};
use tracing::info;

use crate::config::PipelineConfig;
use crate::entry::EntryLookup;
use crate::manifest::Manifest;
use crate::{BundleError, BundleResult};

/// A sealed bundle opened for loading.
pub struct SealedBundle<L: EntryLookup> {
    lookup: L,
    manifest: Manifest,
    engine: DecryptionEngine,
}

impl<L: EntryLookup> SealedBundle<L> {
    /// Opens a sealed bundle.
    ///
    /// A wrong password is not detected here; it surfaces as an
    /// authentication failure on the first artifact load.
    pub fn open(mut lookup: L, password: &str, config: &PipelineConfig) -> BundleResult<Self> {
        let bytes = lookup
            .read_entry(&config.manifest_path)?
            .ok_or_else(|| BundleError::MissingManifest(config.manifest_path.clone()))?;
        let manifest = Manifest::from_json(&bytes)?;

        let master_key = derive_master_key(password, &manifest.salt_bytes()?)?;
        let engine = DecryptionEngine::with_capacity(master_key, config.cache_capacity)
            .with_suite(manifest.suite()?);

        info!(
            artifacts = manifest.total_classes,
            suite = %manifest.algorithm,
            "opened sealed bundle"
        );

        Ok(Self {
            lookup,
            manifest,
            engine,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn engine(&self) -> &DecryptionEngine {
        &self.engine
    }

    pub fn is_sealed(&self, id: &str) -> bool {
        self.manifest.is_sealed(id)
    }

    pub fn artifact_ids(&self) -> impl Iterator<Item = &str> {
        self.manifest.artifact_ids()
    }

    /// Reads the sealed bytes at the artifact's original path and decrypts them.
    pub fn load_artifact(&mut self, id: &str) -> BundleResult<Arc<[u8]>> {
        let path = self.entry_path(id, |e| &e.original_path)?;
        self.load_from(id, path)
    }

    /// Same as [`Self::load_artifact`] but reads the shadow copy.
    pub fn load_shadow(&mut self, id: &str) -> BundleResult<Arc<[u8]>> {
        let path = self.entry_path(id, |e| &e.encrypted_path)?;
        self.load_from(id, path)
    }

    /// Decrypts bytes obtained elsewhere for a sealed artifact.
    pub fn decrypt(&self, id: &str, sealed: &[u8]) -> BundleResult<Arc<[u8]>> {
        if !self.manifest.is_sealed(id) {
            return Err(BundleError::UnknownArtifact(id.to_string()));
        }
        Ok(self.engine.decrypt(id, sealed)?)
    }

    pub fn into_inner(self) -> L {
        self.lookup
    }

    fn entry_path(
        &self,
        id: &str,
        pick: impl Fn(&crate::manifest::ManifestEntry) -> &String,
    ) -> BundleResult<String> {
        self.manifest
            .entry(id)
            .map(|e| pick(e).clone())
            .ok_or_else(|| BundleError::UnknownArtifact(id.to_string()))
    }

    fn load_from(&mut self, id: &str, path: String) -> BundleResult<Arc<[u8]>> {
        if self.engine.is_cached(id) {
            return self.decrypt(id, &[]);
        }
        let bytes = self
            .lookup
            .read_entry(&path)?
            .ok_or(BundleError::MissingEntry(path))?;
        self.decrypt(id, &bytes)
    }
}

impl<L: EntryLookup> std::fmt::Debug for SealedBundle<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedBundle")
            .field("manifest", &self.manifest)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
