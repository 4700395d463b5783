use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::super::args::SynthCommand;
use super::super::exit_status::ExitStatus;
use super::super::report::{
    print_functions, print_module_written, print_synth_success, print_warnings,
};
use crate::config::{ProjectConfig, load_config};
use crate::core::context::SourceInfo;
use crate::core::sink::{DEFAULT_DESCRIPTOR_FILE, remove_stale, write_descriptor, write_module};
use crate::pipeline::transform_file;

/// Transform one module and write its deployment descriptor.
///
/// The transformed module goes to `<outDir>/<stem>.<ext>` under the root,
/// which is where the descriptor's handler references point.
///
/// Configuration errors abort before anything is touched. The previous
/// descriptor is removed before the source is parsed, so a failed run leaves
/// no stale descriptor behind.
pub fn synth(cmd: SynthCommand) -> Result<ExitStatus> {
    let output = match (cmd.output, &cmd.root) {
        (Some(output), _) => output,
        (None, Some(root)) => root.join(DEFAULT_DESCRIPTOR_FILE),
        (None, None) => PathBuf::from(DEFAULT_DESCRIPTOR_FILE),
    };
    // Paths printed to the user stay relative unless --root was given.
    let base = cmd.root.clone().unwrap_or_default();
    let root = match cmd.root {
        Some(root) => root,
        None => env::current_dir().context("Failed to get current directory")?,
    };
    let config = load_config(&root)?;
    remove_stale(&output)?;

    let module_output = module_output_path(&base, &config, &cmd.file);
    let transformed = transform_file(&resolve(&root, cmd.file), &config)?;
    let run = transformed.output;

    print_warnings(&run.warnings);
    write_descriptor(&output, &run.descriptor)?;
    write_module(&module_output, &transformed.code)?;
    print_synth_success(&run.descriptor, &output, run.warnings.len());
    print_module_written(&module_output);
    if cmd.verbose {
        print_functions(&run.descriptor);
    }

    Ok(ExitStatus::Success)
}

// Relative sources are looked up from the working directory first, then from the root.
fn resolve(root: &Path, file: PathBuf) -> PathBuf {
    if file.is_absolute() || file.exists() {
        file
    } else {
        root.join(file)
    }
}

fn module_output_path(base: &Path, config: &ProjectConfig, file: &Path) -> PathBuf {
    let source = SourceInfo::new(&file.to_string_lossy());
    let extension = file
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("js");
    base.join(&config.out_dir)
        .join(format!("{}.{}", source.stem, extension))
}
