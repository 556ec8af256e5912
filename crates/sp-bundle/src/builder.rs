//! Archive builder for turning a bundle directory into a `.zip`.
//!
//! Output is reproducible: entries are sorted (descriptor first), timestamps
//! are pinned to the ZIP epoch and the compression level is fixed.

use crate::validate::validate;
use crate::{BundleError, Descriptor, DescriptorRules, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, Cursor, Seek, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, DateTime};

/// Default Deflate level.
pub const DEFAULT_COMPRESSION_LEVEL: i64 = 6;

/// How bundle files are named inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathPolicy {
    /// Paths relative to the bundle root; the descriptor sits at the archive root.
    #[default]
    RootRelative,
    /// Paths prefixed with the bundle directory name.
    NamePrefixed,
}

impl std::str::FromStr for PathPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "root-relative" | "root" | "installable" => Ok(PathPolicy::RootRelative),
            "name-prefixed" | "prefixed" | "collection" => Ok(PathPolicy::NamePrefixed),
            _ => Err(format!("unknown path policy: {}", s)),
        }
    }
}

impl std::fmt::Display for PathPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathPolicy::RootRelative => write!(f, "root-relative"),
            PathPolicy::NamePrefixed => write!(f, "name-prefixed"),
        }
    }
}

/// Options controlling a build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub rules: DescriptorRules,
    pub policy: PathPolicy,
    /// Deflate level, 0-9.
    pub compression_level: i64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            rules: DescriptorRules::default(),
            policy: PathPolicy::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl BuildOptions {
    pub fn with_policy(mut self, policy: PathPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_rules(mut self, rules: DescriptorRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = level;
        self
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Final archive path.
    pub output: PathBuf,
    /// Number of entries written.
    pub entries: usize,
    /// Sum of entry sizes before compression.
    pub uncompressed_bytes: u64,
    /// Size of the archive file.
    pub archive_bytes: u64,
    /// SHA-256 of the archive file, hex encoded.
    pub sha256: String,
    /// Descriptor of the packaged bundle.
    pub descriptor: Descriptor,
}

#[derive(Debug, Clone)]
struct PendingEntry {
    archive_path: String,
    source: PathBuf,
    bytes: u64,
}

/// Builder for one bundle archive.
pub struct ArchiveBuilder {
    descriptor: Descriptor,
    entries: Vec<PendingEntry>,
    compression_level: i64,
}

impl ArchiveBuilder {
    /// Validate `bundle` and collect its files.
    ///
    /// Fails with [`BundleError::ValidationFailed`] before touching the output.
    pub fn new(bundle: &Path, options: &BuildOptions) -> Result<Self> {
        let descriptor = validate(bundle, &options.rules)
            .map_err(|e| BundleError::ValidationFailed(Box::new(e)))?;
        Self::with_descriptor(bundle, descriptor, options)
    }

    /// Collect files for a bundle whose descriptor was already validated.
    pub fn with_descriptor(
        bundle: &Path,
        descriptor: Descriptor,
        options: &BuildOptions,
    ) -> Result<Self> {
        let prefix = match options.policy {
            PathPolicy::RootRelative => None,
            PathPolicy::NamePrefixed => Some(bundle_name(bundle)?),
        };
        let descriptor_path =
            archive_path(Path::new(&options.rules.file_name), prefix.as_deref())?;

        let mut entries = Vec::new();
        for entry in WalkDir::new(bundle).min_depth(1).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                if entry.file_type().is_symlink() {
                    debug!(path = %entry.path().display(), "Skipped symlink");
                }
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(bundle)
                .map_err(io::Error::other)?;
            let bytes = entry.metadata().map_err(io::Error::from)?.len();
            entries.push(PendingEntry {
                archive_path: archive_path(relative, prefix.as_deref())?,
                source: entry.path().to_path_buf(),
                bytes,
            });
        }

        // Descriptor first, then plain lexicographic order.
        entries.sort_by(|a, b| {
            (a.archive_path != descriptor_path, &a.archive_path)
                .cmp(&(b.archive_path != descriptor_path, &b.archive_path))
        });

        debug!(
            bundle = %bundle.display(),
            files = entries.len(),
            policy = %options.policy,
            "Collected bundle files"
        );

        Ok(Self {
            descriptor,
            entries,
            compression_level: options.compression_level,
        })
    }

    /// Archive paths in write order.
    pub fn entry_paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.archive_path.as_str()).collect()
    }

    /// Number of entries that will be written.
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    /// Total size in bytes before compression.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.bytes).sum()
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Write the archive to `output`.
    ///
    /// Data goes to a sibling `.tmp` file which is renamed over `output` only
    /// after the archive is complete; on failure the temp file is removed.
    pub fn write(self, output: &Path) -> Result<BuildSummary> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = temp_path_for(output);
        if let Err(e) = self.write_file(&temp_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp_path, output) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        let (sha256, archive_bytes) = digest_file(output)?;

        info!(
            path = %output.display(),
            files = self.entries.len(),
            bytes = self.total_bytes(),
            archive_bytes,
            "Archive written"
        );

        Ok(BuildSummary {
            output: output.to_path_buf(),
            entries: self.entries.len(),
            uncompressed_bytes: self.total_bytes(),
            archive_bytes,
            sha256,
            descriptor: self.descriptor,
        })
    }

    /// Write the archive to a byte vector (for in-memory use).
    pub fn write_to_vec(self) -> Result<Vec<u8>> {
        let buffer = self.write_archive(Cursor::new(Vec::new()))?;
        let bytes = buffer.into_inner();

        debug!(
            files = self.entries.len(),
            compressed_bytes = bytes.len(),
            uncompressed_bytes = self.total_bytes(),
            "Archive written to memory"
        );

        Ok(bytes)
    }

    fn write_file(&self, path: &Path) -> Result<()> {
        let file = self.write_archive(File::create(path)?)?;
        file.sync_all()?;
        Ok(())
    }

    fn write_archive<W: Write + Seek>(&self, sink: W) -> Result<W> {
        let mut zip = ZipWriter::new(sink);
        let options = self.file_options();

        for entry in &self.entries {
            zip.start_file(entry.archive_path.as_str(), options)?;
            let mut source = File::open(&entry.source)?;
            io::copy(&mut source, &mut zip)?;
            debug!(path = %entry.archive_path, bytes = entry.bytes, "Added file to archive");
        }

        Ok(zip.finish()?)
    }

    /// Level 0 stores entries uncompressed; Deflate rejects it.
    fn file_options(&self) -> FileOptions<'static, ()> {
        let options = FileOptions::default()
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);
        if self.compression_level == 0 {
            options.compression_method(CompressionMethod::Stored)
        } else {
            options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(self.compression_level))
        }
    }
}

/// Validate and package `bundle` into `output`.
pub fn build(bundle: &Path, output: &Path, options: &BuildOptions) -> Result<BuildSummary> {
    ArchiveBuilder::new(bundle, options)?.write(output)
}

/// Name used for the bundle in name-prefixed archives.
pub fn bundle_name(bundle: &Path) -> Result<String> {
    let name = match bundle.file_name() {
        Some(name) => name.to_os_string(),
        None => match bundle.canonicalize()?.file_name() {
            Some(name) => name.to_os_string(),
            None => return Ok("bundle".to_string()),
        },
    };
    Ok(utf8_component(&name, bundle)?.to_string())
}

/// Join the components of `relative` with `/`, under an optional prefix.
///
/// Non-UTF-8 components are rejected rather than rewritten, so every entry
/// name matches the file it came from.
fn archive_path(relative: &Path, prefix: Option<&str>) -> io::Result<String> {
    let mut parts: Vec<&str> = prefix.into_iter().collect();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(utf8_component(part, relative)?);
        }
    }
    Ok(parts.join("/"))
}

fn utf8_component<'a>(part: &'a OsStr, path: &Path) -> io::Result<&'a str> {
    part.to_str().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("non-UTF-8 file name in {}", path.display()),
        )
    })
}

fn temp_path_for(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("archive"));
    name.push(".tmp");
    output.with_file_name(name)
}

fn digest_file(path: &Path) -> Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok((hex::encode(hasher.finalize()), bytes))
}
