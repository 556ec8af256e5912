//! skillpack core: configuration, logging, exit codes and report rendering
//! shared by the `skillpack` binary.
//!
//! The packaging pipeline itself lives in `sp-bundle`.

pub mod config;
pub mod exit_codes;
pub mod logging;
pub mod output;
