//! Batch orchestration over a directory of units.
//!
//! A unit is a bundle directory (package/check) or an archive file (verify).
//! Per-unit failures become reports; only a missing discovery root aborts.

use crate::builder::{ArchiveBuilder, BuildOptions};
use crate::validate::validate;
use crate::verifier::verify;
use crate::{BundleError, ErrorKind, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default archive file extension (without the dot).
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "zip";

/// What to do with each discovered unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Validate and build one archive per bundle directory.
    Package,
    /// Verify every archive in a directory.
    Verify,
    /// Validate bundle directories without writing anything.
    Check,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Package => write!(f, "package"),
            Mode::Verify => write!(f, "verify"),
            Mode::Check => write!(f, "check"),
        }
    }
}

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub build: BuildOptions,
    /// Where package mode writes `<unit>.<archive_extension>`.
    pub output_dir: PathBuf,
    pub archive_extension: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            build: BuildOptions::default(),
            output_dir: PathBuf::from("packaged-skills"),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
        }
    }
}

/// Result for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl UnitReport {
    fn success(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ok: true,
            kind: None,
            reason: reason.into(),
            entries: None,
            bytes: None,
            sha256: None,
            output: None,
        }
    }

    fn failure(unit: impl Into<String>, error: &BundleError) -> Self {
        Self {
            unit: unit.into(),
            ok: false,
            kind: Some(error.root_kind()),
            reason: error.to_string(),
            entries: None,
            bytes: None,
            sha256: None,
            output: None,
        }
    }
}

/// Aggregate counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTotals {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// All reports of one run, in unit-name order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub mode: Mode,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub totals: BatchTotals,
    pub units: Vec<UnitReport>,
}

impl BatchSummary {
    fn new(mode: Mode, root: &Path) -> Self {
        Self {
            mode,
            root: root.to_path_buf(),
            started_at: Utc::now(),
            totals: BatchTotals::default(),
            units: Vec::new(),
        }
    }

    fn push(&mut self, report: UnitReport) {
        self.totals.attempted += 1;
        if report.ok {
            self.totals.succeeded += 1;
        } else {
            self.totals.failed += 1;
        }
        self.units.push(report);
    }

    pub fn attempted(&self) -> usize {
        self.totals.attempted
    }

    pub fn succeeded(&self) -> usize {
        self.totals.succeeded
    }

    /// Failed reports, in unit order.
    pub fn failures(&self) -> Vec<&UnitReport> {
        self.units.iter().filter(|r| !r.ok).collect()
    }

    /// True only if at least one unit ran and none failed.
    pub fn is_success(&self) -> bool {
        self.totals.attempted > 0 && self.totals.failed == 0
    }

    /// Kind describing overall failure, if any.
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        if self.totals.attempted == 0 {
            Some(ErrorKind::NoUnitsFound)
        } else {
            self.failures().first().and_then(|r| r.kind)
        }
    }

    /// Serialize with consistent formatting.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A discovered unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub path: PathBuf,
}

/// List units under `root`, sorted by name.
///
/// Package/check mode yields immediate subdirectories; verify mode yields
/// files with the archive extension. Hidden entries and anything else are skipped.
pub fn discover(root: &Path, mode: Mode, archive_extension: &str) -> Result<Vec<Unit>> {
    if !root.is_dir() {
        return Err(BundleError::RootNotFound(root.to_path_buf()));
    }

    let mut units = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            continue;
        }

        match mode {
            Mode::Package | Mode::Check => {
                if path.is_dir() {
                    units.push(Unit {
                        name: file_name,
                        path,
                    });
                }
            }
            Mode::Verify => {
                let matches_extension = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(archive_extension));
                if path.is_file() && matches_extension {
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or(file_name);
                    units.push(Unit { name, path });
                }
            }
        }
    }

    units.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
    Ok(units)
}

/// Discover and process every unit under `root`.
pub fn run(root: &Path, mode: Mode, options: &BatchOptions) -> Result<BatchSummary> {
    let mut units = discover(root, mode, &options.archive_extension)?;
    if mode != Mode::Verify {
        // The output directory may live under the source root; it is never a unit.
        if let Ok(output_dir) = options.output_dir.canonicalize() {
            units.retain(|unit| {
                let is_output = unit.path.canonicalize().is_ok_and(|p| p == output_dir);
                if is_output {
                    debug!(unit = %unit.name, "Skipped output directory");
                }
                !is_output
            });
        }
    }
    let mut summary = BatchSummary::new(mode, root);

    if units.is_empty() {
        warn!(root = %root.display(), %mode, "No units found");
        return Ok(summary);
    }

    info!(root = %root.display(), %mode, units = units.len(), "Batch started");

    for unit in &units {
        let report = match mode {
            Mode::Package => package_unit(unit, options),
            Mode::Verify => verify_unit(unit, options),
            Mode::Check => check_unit(unit, options),
        };

        if report.ok {
            info!(unit = %report.unit, reason = %report.reason, "Unit ok");
        } else {
            warn!(unit = %report.unit, reason = %report.reason, "Unit failed");
        }
        summary.push(report);
    }

    info!(
        attempted = summary.attempted(),
        succeeded = summary.succeeded(),
        "Batch finished"
    );

    Ok(summary)
}

fn package_unit(unit: &Unit, options: &BatchOptions) -> UnitReport {
    let descriptor = match validate(&unit.path, &options.build.rules) {
        Ok(descriptor) => descriptor,
        Err(e) => return UnitReport::failure(&unit.name, &e),
    };

    let output = options
        .output_dir
        .join(format!("{}.{}", unit.name, options.archive_extension));

    let result = ArchiveBuilder::with_descriptor(&unit.path, descriptor, &options.build)
        .and_then(|builder| builder.write(&output));

    match result {
        Ok(built) => UnitReport {
            entries: Some(built.entries),
            bytes: Some(built.archive_bytes),
            sha256: Some(built.sha256),
            output: Some(built.output),
            ..UnitReport::success(&unit.name, format!("OK ({} files)", built.entries))
        },
        Err(e) => UnitReport::failure(&unit.name, &e),
    }
}

fn verify_unit(unit: &Unit, options: &BatchOptions) -> UnitReport {
    match verify(&unit.path, &options.build.rules) {
        Ok(verified) => UnitReport {
            entries: Some(verified.entries),
            bytes: Some(verified.uncompressed_bytes),
            ..UnitReport::success(&unit.name, format!("OK ({} files)", verified.entries))
        },
        Err(e) => UnitReport::failure(&unit.name, &e),
    }
}

fn check_unit(unit: &Unit, options: &BatchOptions) -> UnitReport {
    match validate(&unit.path, &options.build.rules) {
        Ok(descriptor) => UnitReport::success(&unit.name, format!("OK ({})", descriptor.name)),
        Err(e) => UnitReport::failure(&unit.name, &e),
    }
}
