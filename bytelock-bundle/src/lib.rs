//! Sealed bundles.
//!
//! A sealed bundle is an ordinary bundle (e.g. a zip archive) in which:
//! - every artifact (`*.class` outside `META-INF/` by default) is replaced by
//!   its sealed bytes
//! - a shadow copy of each sealed artifact lives under `META-INF/.sealed/`
//! - `META-INF/.bytelock/manifest.json` records the salt, cipher suite and
//!   the sealed artifacts
//!
//! [`EncryptionPipeline`] produces sealed bundles; [`SealedBundle`] opens
//! them at load time.

mod archive;
mod config;
mod entry;
mod error;
mod loader;
mod manifest;
mod pipeline;

pub use archive::{ZipBundleReader, ZipBundleWriter};
pub use config::{
    PipelineConfig, DEFAULT_ARTIFACT_SUFFIX, DEFAULT_MANIFEST_PATH, DEFAULT_METADATA_PREFIX,
    DEFAULT_SHADOW_PREFIX,
};
pub use entry::{BundleEntry, EntryLookup, EntrySink, EntrySource, MemoryBundle};
pub use error::{BundleError, BundleResult};
pub use loader::SealedBundle;
pub use manifest::{Manifest, ManifestEntry, MANIFEST_VERSION};
pub use pipeline::{EncryptionPipeline, EntryAction, PipelineReport, SealedArtifact};
