//! skillpack - package skill bundles into archives and verify them.
//!
//! Commands:
//! - `pack`: validate and package every bundle directory under a source root
//! - `verify`: check every archive in a directory
//! - `check`: validate bundle directories without writing anything

use clap::{Args, Parser, Subcommand};
use sp_bundle::batch::{self, BatchOptions, Mode};
use sp_bundle::PathPolicy;
use sp_core::config::{load_config, ConfigError};
use sp_core::exit_codes::ExitCode;
use sp_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use sp_core::output::{render, OutputFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, info_span, warn};

/// Package and verify skill bundles
#[derive(Parser)]
#[command(name = "skillpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to config file (also read from SKILLPACK_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "human")]
    format: OutputFormat,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all logging on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    no_color: bool,

    /// Prefix human log lines with timestamps
    #[arg(long, global = true)]
    timestamps: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and package every bundle under SOURCE, one archive per bundle
    Pack(PackArgs),

    /// Verify every archive in a directory
    Verify(VerifyArgs),

    /// Validate bundles without writing archives
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct PackArgs {
    /// Directory containing one subdirectory per bundle
    source: PathBuf,

    /// Output directory for archives
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Archive path layout: root-relative or name-prefixed
    #[arg(long)]
    policy: Option<PathPolicy>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Directory containing archives
    dir: PathBuf,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Directory containing one subdirectory per bundle
    source: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.global.quiet {
        Some(LogLevel::Off)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    // Machine-readable stdout gets machine-readable stderr.
    let log_format = (cli.global.format == OutputFormat::Json).then_some(LogFormat::Jsonl);

    let mut log_config =
        LogConfig::from_env(log_level, log_format).with_timestamps(cli.global.timestamps);
    if cli.global.no_color {
        log_config = log_config.with_color(false);
    }
    init_logging(&log_config);

    let exit_code = match load_config(cli.global.config.as_deref()) {
        Ok(loaded) => {
            debug!(source = %loaded.source, path = ?loaded.path, "Config resolved");
            let config = &loaded.config;
            match &cli.command {
                Commands::Pack(args) => run_batch(
                    &cli.global,
                    Mode::Package,
                    &args.source,
                    config.batch_options(args.output.as_deref(), args.policy),
                ),
                Commands::Verify(args) => run_batch(
                    &cli.global,
                    Mode::Verify,
                    &args.dir,
                    config.batch_options(None, None),
                ),
                Commands::Check(args) => run_batch(
                    &cli.global,
                    Mode::Check,
                    &args.source,
                    config.batch_options(None, None),
                ),
            }
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            config_exit_code(&e)
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn config_exit_code(error: &ConfigError) -> ExitCode {
    match error {
        ConfigError::IoError { .. } => ExitCode::IoError,
        ConfigError::NotFound { .. } | ConfigError::ParseError { .. } | ConfigError::Invalid(_) => {
            ExitCode::ConfigError
        }
    }
}

fn run_batch(global: &GlobalOpts, mode: Mode, root: &Path, options: BatchOptions) -> ExitCode {
    let run_id = generate_run_id();
    let span = info_span!("run", run_id = %run_id, %mode);
    let _guard = span.enter();

    let summary = match batch::run(root, mode, &options) {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Run aborted");
            eprintln!("ERROR: {e}");
            return ExitCode::from_fatal(&e);
        }
    };

    match render(&summary, global.format) {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => {
            eprintln!("ERROR: failed to render report: {e}");
            return ExitCode::InternalError;
        }
    }

    let code = ExitCode::from_summary(&summary);
    if code.is_success() {
        info!(exit_code = %code, "Run finished");
    } else {
        warn!(exit_code = %code, "Run finished with failures");
    }
    code
}
