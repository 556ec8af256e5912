//! Skill bundle validation, packaging and verification.
//!
//! A skill bundle is a directory with a `SKILL.md` descriptor at its root plus
//! an arbitrary file tree. This crate turns bundles into reproducible ZIP
//! archives and later proves those archives are well-formed.
//!
//! # Pipeline
//!
//! - [`validate`]: descriptor present, header well-formed, required keys set
//! - [`build`]: validate, then write one archive per bundle (descriptor first)
//! - [`verify`]: re-open an archive, check every CRC and the root descriptor
//! - [`batch::run`]: drive the above over every unit under a directory
//!
//! # Example
//!
//! ```no_run
//! use sp_bundle::{build, verify, BuildOptions, DescriptorRules, PathPolicy};
//! use std::path::Path;
//!
//! let options = BuildOptions::default().with_policy(PathPolicy::RootRelative);
//! let built = build(Path::new("skills/pdf"), Path::new("out/pdf.zip"), &options).unwrap();
//!
//! let verified = verify(&built.output, &DescriptorRules::default()).unwrap();
//! assert_eq!(verified.entries, built.entries);
//! ```

pub mod batch;
pub mod builder;
pub mod descriptor;
pub mod error;
pub mod validate;
pub mod verifier;

pub use batch::{BatchOptions, BatchSummary, BatchTotals, Mode, Unit, UnitReport};
pub use builder::{build, ArchiveBuilder, BuildOptions, BuildSummary, PathPolicy};
pub use descriptor::{Descriptor, DescriptorRules, DEFAULT_DESCRIPTOR_NAME, REQUIRED_KEYS};
pub use error::{BundleError, ErrorKind, Result};
pub use validate::validate;
pub use verifier::{verify, verify_bytes, ArchiveVerifier, VerifySummary};
