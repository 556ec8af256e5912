//! Exit codes for the skillpack CLI.
//!
//! Exit code ranges:
//! - 0-9: Batch outcomes (parse outcome from code, not output)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal and I/O errors

use sp_bundle::{BatchSummary, BundleError, ErrorKind};

/// Exit codes for skillpack operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Batch Outcomes (0-9)
    // ========================================================================
    /// Every discovered unit succeeded
    Clean = 0,

    /// At least one unit failed
    UnitsFailed = 1,

    /// Discovery found nothing to process
    NoUnitsFound = 3,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Config file missing, unparseable or invalid
    ConfigError = 11,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error, including a missing discovery root
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::UnitsFailed => "ERR_UNITS_FAILED",
            ExitCode::NoUnitsFound => "ERR_NO_UNITS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Overall outcome of a finished batch.
    pub fn from_summary(summary: &BatchSummary) -> Self {
        match summary.failure_kind() {
            None => ExitCode::Clean,
            Some(ErrorKind::NoUnitsFound) => ExitCode::NoUnitsFound,
            Some(_) => ExitCode::UnitsFailed,
        }
    }

    /// Exit code for an error that aborted the whole run.
    pub fn from_fatal(error: &BundleError) -> Self {
        match error {
            BundleError::RootNotFound(_) | BundleError::Io(_) => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
