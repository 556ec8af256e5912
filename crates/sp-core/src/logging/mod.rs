//! Structured logging for skillpack.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for CI pipelines
//!
//! stdout is reserved for the batch report; all log output goes to stderr.

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the filter.
///
/// `LogLevel::Off` (from `-q`) silences everything; otherwise `RUST_LOG`
/// wins over the configured level for our crates.
fn build_filter(config: &LogConfig) -> EnvFilter {
    build_filter_from(config, std::env::var("RUST_LOG").ok())
}

fn build_filter_from(config: &LogConfig, rust_log: Option<String>) -> EnvFilter {
    let level = config.level;
    if level == LogLevel::Off {
        return EnvFilter::new("off");
    }
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            EnvFilter::new(format!("sp_core={level},sp_bundle={level},skillpack={level}"))
        })
}

/// Initialize the logging subsystem.
///
/// Must be called once at startup before any logging occurs. Calling it a
/// second time is a no-op.
pub fn init_logging(config: &LogConfig) {
    let filter = build_filter(config);

    match config.format {
        LogFormat::Human => {
            let use_ansi = config.color && std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init();
            } else {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init();
            }
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(false);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    // Shorten to first 12 hex chars for readability
    format!("run-{}", &uuid[..12])
}
