//! Pre-packaging validation of a bundle directory.

use crate::{BundleError, Descriptor, DescriptorRules, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Check that `bundle` has a well-formed descriptor at its root.
///
/// Returns the parsed descriptor. Never writes anything.
///
/// The descriptor must be a regular file: the builder never follows
/// symlinks, so a linked descriptor would be missing from the archive.
pub fn validate(bundle: &Path, rules: &DescriptorRules) -> Result<Descriptor> {
    let path = bundle.join(&rules.file_name);
    let missing = |what: &str| {
        BundleError::MissingDescriptor(format!(
            "{} {what} in {}",
            rules.file_name,
            bundle.display()
        ))
    };

    match fs::symlink_metadata(&path) {
        Ok(meta) if meta.file_type().is_file() => {}
        Ok(meta) if meta.file_type().is_symlink() => return Err(missing("is a symlink")),
        Ok(_) => return Err(missing("is not a regular file")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(missing("not found")),
        Err(e) => return Err(e.into()),
    }

    let bytes = fs::read(&path)?;
    let descriptor = Descriptor::from_bytes(&bytes, rules)?;

    debug!(
        bundle = %bundle.display(),
        name = %descriptor.name,
        "Bundle descriptor valid"
    );

    Ok(descriptor)
}
