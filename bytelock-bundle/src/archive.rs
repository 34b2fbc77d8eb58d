//! Zip-backed bundle entries.

use std::io::{Read, Seek, Write};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::entry::{BundleEntry, EntryLookup, EntrySink, EntrySource};
use crate::BundleResult;

/// Reads a zip bundle entry by entry, or by name.
pub struct ZipBundleReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    next_index: usize,
}

impl<R: Read + Seek> ZipBundleReader<R> {
    pub fn new(reader: R) -> BundleResult<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
            next_index: 0,
        })
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    pub fn into_inner(self) -> R {
        self.archive.into_inner()
    }
}

impl<R: Read + Seek> EntrySource for ZipBundleReader<R> {
    fn next_entry(&mut self) -> BundleResult<Option<BundleEntry>> {
        if self.next_index >= self.archive.len() {
            return Ok(None);
        }

        let mut file = self.archive.by_index(self.next_index)?;
        self.next_index += 1;

        let name = file.name().to_string();
        if file.is_dir() {
            return Ok(Some(BundleEntry::directory(name)));
        }

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(Some(BundleEntry::file(name, data)))
    }
}

impl<R: Read + Seek> EntryLookup for ZipBundleReader<R> {
    fn read_entry(&mut self, name: &str) -> BundleResult<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if file.is_dir() {
            return Ok(None);
        }

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }
}

/// Writes a deflated zip bundle.
pub struct ZipBundleWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ZipBundleWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated),
        }
    }

    /// Writes the central directory and returns the underlying writer.
    pub fn finish(self) -> BundleResult<W> {
        Ok(self.zip.finish()?)
    }
}

impl<W: Write + Seek> EntrySink for ZipBundleWriter<W> {
    fn write_directory(&mut self, name: &str) -> BundleResult<()> {
        self.zip.add_directory(name, self.options)?;
        Ok(())
    }

    fn write_file(&mut self, name: &str, data: &[u8]) -> BundleResult<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }
}
