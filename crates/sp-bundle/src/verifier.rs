//! Archive verifier for checking a produced `.zip` before distribution.
//!
//! Every entry is decompressed in memory so its CRC-32 is checked; nothing is
//! extracted to disk.

use crate::{BundleError, Descriptor, DescriptorRules, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Outcome of a successful verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySummary {
    /// Number of file entries (directory entries excluded).
    pub entries: usize,
    /// Sum of decompressed entry sizes.
    pub uncompressed_bytes: u64,
    /// File entry names in archive order.
    pub names: Vec<String>,
    /// Parsed root descriptor.
    pub descriptor: Descriptor,
}

/// Reader that verifies a bundle archive.
pub struct ArchiveVerifier<R: Read + Seek> {
    archive: ZipArchive<R>,
    rules: DescriptorRules,
}

impl ArchiveVerifier<File> {
    /// Open an archive from a file path.
    pub fn open(path: &Path, rules: DescriptorRules) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, rules)
    }
}

impl ArchiveVerifier<Cursor<Vec<u8>>> {
    /// Open an archive from bytes.
    pub fn from_bytes(bytes: Vec<u8>, rules: DescriptorRules) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes), rules)
    }
}

impl<R: Read + Seek> ArchiveVerifier<R> {
    /// Create a verifier from any Read + Seek source.
    ///
    /// Fails with [`BundleError::Corrupted`] if the central directory cannot be read.
    pub fn from_reader(reader: R, rules: DescriptorRules) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| BundleError::Corrupted(format!("unreadable archive: {e}")))?;
        Ok(Self { archive, rules })
    }

    /// Number of entries in the central directory, directories included.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Check every entry, then the root descriptor.
    pub fn verify(&mut self) -> Result<VerifySummary> {
        let mut names = Vec::new();
        let mut uncompressed_bytes = 0u64;
        let mut descriptor_bytes = None;

        for index in 0..self.archive.len() {
            let mut file = self
                .archive
                .by_index(index)
                .map_err(|e| BundleError::Corrupted(format!("entry #{index}: {e}")))?;
            let name = file.name().to_string();

            if file.enclosed_name().is_none() {
                return Err(BundleError::Corrupted(format!("unsafe entry path '{name}'")));
            }
            if file.is_dir() {
                continue;
            }

            let mut data = Vec::new();
            if let Err(e) = file.read_to_end(&mut data) {
                warn!(entry = %name, error = %e, "Entry failed integrity check");
                return Err(BundleError::Corrupted(format!("entry '{name}': {e}")));
            }
            debug!(entry = %name, bytes = data.len(), "Entry verified");

            uncompressed_bytes += data.len() as u64;
            if name == self.rules.file_name {
                descriptor_bytes = Some(data);
            }
            names.push(name);
        }

        let bytes = descriptor_bytes.ok_or_else(|| {
            BundleError::MissingDescriptor(format!("no {} at archive root", self.rules.file_name))
        })?;
        let descriptor = Descriptor::from_bytes(&bytes, &self.rules)?;

        info!(
            name = %descriptor.name,
            files = names.len(),
            bytes = uncompressed_bytes,
            "Archive verified"
        );

        Ok(VerifySummary {
            entries: names.len(),
            uncompressed_bytes,
            names,
            descriptor,
        })
    }
}

/// Verify the archive at `path`.
pub fn verify(path: &Path, rules: &DescriptorRules) -> Result<VerifySummary> {
    ArchiveVerifier::open(path, rules.clone())?.verify()
}

/// Verify an in-memory archive.
pub fn verify_bytes(bytes: Vec<u8>, rules: &DescriptorRules) -> Result<VerifySummary> {
    ArchiveVerifier::from_bytes(bytes, rules.clone())?.verify()
}
