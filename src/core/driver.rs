//! Run driver.
//!
//! One run transforms one module:
//!
//! 1. Create a fresh [`RunContext`] (empty descriptor and deferred queue)
//! 2. Traverse the module with the [`Dispatcher`]
//! 3. Execute each distinct deferred action once
//! 4. Hand the descriptor and diagnostics back to the caller
//!
//! The context is dropped when the run returns, so nothing carries over into
//! the next module.

use std::sync::Arc;

use anyhow::{Context, Result};
use swc_common::SourceMap;
use swc_ecma_ast::Module;
use swc_ecma_visit::VisitMutWith;

use crate::config::ProjectConfig;
use crate::diagnostics::Warning;

use super::builder::SwcTreeBuilder;
use super::context::{RunContext, SourceInfo};
use super::descriptor::Descriptor;
use super::dispatch::Dispatcher;
use super::parsers::source::ExtractedComments;
use super::registry::Registry;

/// Result of a finished run.
#[derive(Debug)]
pub struct RunOutput {
    pub descriptor: Descriptor,
    pub warnings: Vec<Warning>,
    /// Names of the deferred actions that were executed, in execution order.
    pub deferred_actions: Vec<&'static str>,
}

/// Transform `module` in place and synthesize its deployment descriptor.
///
/// Handler problems are reported as warnings; only a failing deferred action
/// aborts the run.
pub fn run_module(
    module: &mut Module,
    comments: &ExtractedComments,
    source_map: &Arc<SourceMap>,
    file_path: &str,
    config: &ProjectConfig,
    registry: &Registry,
) -> Result<RunOutput> {
    let mut cx = RunContext::new(
        SourceInfo::new(file_path),
        config.clone(),
        Box::new(SwcTreeBuilder::new(source_map.clone())),
    );
    cx.warnings.extend(registry.warnings().iter().cloned());

    {
        let mut dispatcher = Dispatcher::new(registry, &mut cx, comments, source_map);
        module.visit_mut_with(&mut dispatcher);
    }

    let actions = cx.deferred.drain();
    for action in &actions {
        (action.apply)(module, &cx)
            .with_context(|| format!("Deferred action \"{}\" failed", action.name))?;
    }

    Ok(RunOutput {
        descriptor: cx.descriptor,
        warnings: cx.warnings,
        deferred_actions: actions.iter().map(|action| action.name).collect(),
    })
}
