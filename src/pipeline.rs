//! Source-to-descriptor pipeline.
//!
//! Parses one module, selects the annotation registry for the configured
//! provider and runs the driver over it. The mutated module is returned
//! together with its emitted JavaScript and the run output.

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use swc_common::SourceMap;
use swc_ecma_ast::Module;

use crate::aws;
use crate::config::ProjectConfig;
use crate::core::driver::{RunOutput, run_module};
use crate::core::emit::render_module;
use crate::core::parsers::source::parse_source;
use crate::core::registry::Registry;
use crate::diagnostics::{Warning, WarningKind};

pub const DEFAULT_PROVIDER: &str = "aws";

#[derive(Debug)]
pub struct Transformed {
    pub module: Module,
    /// The mutated module printed as JavaScript.
    pub code: String,
    pub output: RunOutput,
}

/// Annotation registry for a provider.
///
/// Unknown providers fall back to the AWS kinds; the returned warning says so.
pub fn registry_for(provider: &str) -> Result<(Registry, Option<WarningKind>)> {
    let fallback = if provider.eq_ignore_ascii_case(DEFAULT_PROVIDER) {
        None
    } else {
        Some(WarningKind::UnknownProvider {
            name: provider.to_string(),
            fallback: DEFAULT_PROVIDER.to_string(),
        })
    };
    Ok((aws::registry()?, fallback))
}

pub fn transform_source(code: String, file_path: &str, config: &ProjectConfig) -> Result<Transformed> {
    let (registry, provider_warning) = registry_for(&config.provider)?;

    let parsed = parse_source(code, file_path, Arc::new(SourceMap::default()))?;
    let mut module = parsed.module;
    let mut output = run_module(
        &mut module,
        &parsed.comments,
        &parsed.source_map,
        file_path,
        config,
        &registry,
    )?;

    if let Some(kind) = provider_warning {
        output.warnings.insert(0, Warning::new(kind));
    }

    let code = render_module(&module, &parsed.source_map)?;
    Ok(Transformed {
        module,
        code,
        output,
    })
}

pub fn transform_file(path: &Path, config: &ProjectConfig) -> Result<Transformed> {
    let code = fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file: {}", path.display()))?;
    transform_source(code, &path.to_string_lossy(), config)
}
