//! Named entries in, named entries out.
//!
//! The pipeline reads a bundle through [`EntrySource`] and writes the sealed
//! bundle through [`EntrySink`]; the loader needs random access and uses
//! [`EntryLookup`]. [`MemoryBundle`] implements all three.

use crate::BundleResult;
use std::collections::VecDeque;

/// One entry of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub name: String,
    pub is_dir: bool,
    pub data: Vec<u8>,
}

impl BundleEntry {
    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            data: data.into(),
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            data: Vec::new(),
        }
    }
}

/// Ordered iteration over the entries of an input bundle.
pub trait EntrySource {
    /// Returns the next entry, or `None` once the bundle is exhausted.
    fn next_entry(&mut self) -> BundleResult<Option<BundleEntry>>;
}

/// Destination for the entries of an output bundle.
pub trait EntrySink {
    fn write_directory(&mut self, name: &str) -> BundleResult<()>;

    fn write_file(&mut self, name: &str, data: &[u8]) -> BundleResult<()>;
}

/// Random access to entries by name.
pub trait EntryLookup {
    /// Returns the bytes of file entry `name`, or `None` if absent.
    fn read_entry(&mut self, name: &str) -> BundleResult<Option<Vec<u8>>>;
}

/// An in-memory bundle that keeps entries in insertion order.
///
/// As a source it yields entries front to back without consuming them, so
/// the same bundle can be read again after [`MemoryBundle::rewind`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBundle {
    entries: Vec<BundleEntry>,
    cursor: usize,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a file entry.
    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.entries.push(BundleEntry::file(name, data));
        self
    }

    /// Appends a directory entry.
    pub fn with_directory(mut self, name: impl Into<String>) -> Self {
        self.entries.push(BundleEntry::directory(name));
        self
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Looks up an entry by name without moving the cursor.
    pub fn get(&self, name: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entry names in order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restarts iteration from the first entry.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl FromIterator<BundleEntry> for MemoryBundle {
    fn from_iter<I: IntoIterator<Item = BundleEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            cursor: 0,
        }
    }
}

impl EntrySource for MemoryBundle {
    fn next_entry(&mut self) -> BundleResult<Option<BundleEntry>> {
        let entry = self.entries.get(self.cursor).cloned();
        if entry.is_some() {
            self.cursor += 1;
        }
        Ok(entry)
    }
}

impl EntrySink for MemoryBundle {
    fn write_directory(&mut self, name: &str) -> BundleResult<()> {
        self.entries.push(BundleEntry::directory(name));
        Ok(())
    }

    fn write_file(&mut self, name: &str, data: &[u8]) -> BundleResult<()> {
        self.entries.push(BundleEntry::file(name, data));
        Ok(())
    }
}

impl EntryLookup for MemoryBundle {
    fn read_entry(&mut self, name: &str) -> BundleResult<Option<Vec<u8>>> {
        Ok(self
            .get(name)
            .filter(|e| !e.is_dir)
            .map(|e| e.data.clone()))
    }
}

/// Consuming source over an owned list of entries.
impl EntrySource for VecDeque<BundleEntry> {
    fn next_entry(&mut self) -> BundleResult<Option<BundleEntry>> {
        Ok(self.pop_front())
    }
}
