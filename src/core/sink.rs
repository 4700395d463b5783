//! Descriptor and module persistence.
//!
//! The descriptor of the previous run is removed before a new run starts, so
//! a failed run never leaves a stale document behind.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

use super::descriptor::Descriptor;

pub const DEFAULT_DESCRIPTOR_FILE: &str = "serverless.yml";

/// Serialize the descriptor as YAML.
pub fn render_descriptor(descriptor: &Descriptor) -> Result<String> {
    serde_yaml_ng::to_string(descriptor).context("Failed to serialize deployment descriptor")
}

/// Write the descriptor to `path`, creating parent directories as needed.
pub fn write_descriptor(path: &Path, descriptor: &Descriptor) -> Result<()> {
    write_file(path, &render_descriptor(descriptor)?)
}

/// Write emitted module code to `path`, creating parent directories as needed.
pub fn write_module(path: &Path, code: &str) -> Result<()> {
    write_file(path, code)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Delete a descriptor left by a previous run. Returns true if one was removed.
pub fn remove_stale(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("Failed to remove file: {}", path.display())),
    }
}
