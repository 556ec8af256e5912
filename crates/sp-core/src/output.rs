//! Rendering of batch summaries for stdout.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sp_bundle::{BatchSummary, Mode};
use std::fmt::Write;

/// Supported output formats for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Status line per unit plus a summary (default)
    #[default]
    Human,

    /// The whole batch summary as pretty JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Human => write!(f, "human"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn verb(mode: Mode) -> (&'static str, &'static str) {
    match mode {
        Mode::Package => ("Packaging", "packaged"),
        Mode::Verify => ("Verifying", "verified"),
        Mode::Check => ("Checking", "valid"),
    }
}

/// Render the human-readable report.
///
/// One line per unit, then a summary line, then the failing subset again so
/// it is visible without scrolling.
pub fn render_human(summary: &BatchSummary) -> String {
    let (heading, done) = verb(summary.mode);
    let mut out = String::new();

    let _ = writeln!(out, "{heading} units in {}", summary.root.display());
    let _ = writeln!(out);

    if summary.attempted() == 0 {
        let _ = writeln!(out, "ERROR: no units found in {}", summary.root.display());
        return out;
    }

    for report in &summary.units {
        let status = if report.ok { "[OK]" } else { "[FAIL]" };
        let _ = writeln!(out, "{status:<7}{:<32} {}", report.unit, report.reason);
    }
    let _ = writeln!(out);

    let total = summary.attempted();
    let succeeded = summary.succeeded();
    if summary.is_success() {
        let _ = writeln!(out, "SUCCESS: {succeeded}/{total} units {done}");
        if summary.mode == Mode::Package {
            if let Some(dir) = summary
                .units
                .iter()
                .find_map(|r| r.output.as_ref())
                .and_then(|p| p.parent())
            {
                let _ = writeln!(out, "Output directory: {}", dir.display());
            }
        }
    } else {
        let failures = summary.failures();
        let _ = writeln!(out, "WARNING: {succeeded}/{total} units {done}");
        let _ = writeln!(out, "ERROR: {} unit(s) failed:", failures.len());
        for report in failures {
            let kind = report.kind.map(|k| k.as_str()).unwrap_or("unknown");
            let _ = writeln!(out, "  - {} [{kind}]: {}", report.unit, report.reason);
        }
    }

    out
}

/// Render the summary in the requested format.
pub fn render(summary: &BatchSummary, format: OutputFormat) -> sp_bundle::Result<String> {
    match format {
        OutputFormat::Human => Ok(render_human(summary)),
        OutputFormat::Json => summary.to_json(),
    }
}
