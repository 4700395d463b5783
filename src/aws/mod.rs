//! AWS annotation kinds.
//!
//! ## Module Structure
//!
//! - `cloudfunction`: `@cloudfunction`, the base kind every other kind depends on
//! - `warmup`: `@warmup`, scheduled warm-up pings
//! - `httpapi`: `@httpapi`, HTTP API routes
//! - `autotune`: `@autotune`, memory tuning alarms and the `autotune` function
//! - `target`: the function a declaration-level annotation applies to
//!
//! Dependent kinds are registered before `@cloudfunction` so they still see
//! the original declaration before it is rewritten into an export.

pub mod autotune;
pub mod cloudfunction;
pub mod httpapi;
pub mod target;
pub mod warmup;

use anyhow::Result;
use swc_ecma_ast::Module;

use crate::core::context::RunContext;
use crate::core::deferred::DeferredAction;
use crate::core::registry::{AnnotationKindDefinition, NodeKind, Registry};

pub const CLOUDFUNCTION: &str = "cloudfunction";

pub fn definitions() -> Vec<AnnotationKindDefinition> {
    vec![
        AnnotationKindDefinition::new("autotune")
            .depends_on(CLOUDFUNCTION)
            .handler(NodeKind::FunctionDeclaration, autotune::tune_memory)
            .handler(NodeKind::VariableDeclaration, autotune::tune_memory),
        AnnotationKindDefinition::new("warmup")
            .depends_on(CLOUDFUNCTION)
            .handler(NodeKind::FunctionDeclaration, warmup::schedule_warmup)
            .handler(NodeKind::VariableDeclaration, warmup::schedule_warmup),
        AnnotationKindDefinition::new("httpapi")
            .depends_on(CLOUDFUNCTION)
            .handler(NodeKind::FunctionDeclaration, httpapi::add_route)
            .handler(NodeKind::VariableDeclaration, httpapi::add_route),
        AnnotationKindDefinition::new(CLOUDFUNCTION)
            .handler(NodeKind::FunctionDeclaration, cloudfunction::export_declaration)
            .handler(NodeKind::VariableDeclaration, cloudfunction::export_declaration)
            .generic_handler(NodeKind::CallExpression, cloudfunction::invoke_remote),
    ]
}

pub fn registry() -> Result<Registry> {
    Registry::new(definitions())
}

/// Prepends the SDK import.
pub const AWS_SDK: DeferredAction = DeferredAction::new("aws-sdk", require_aws_sdk);

/// Appends the `invokeLambda` helper used by remote calls.
pub const INVOKE_LAMBDA: DeferredAction = DeferredAction::new("invoke-lambda", append_invoke_lambda);

/// Appends the handler of the `autotune` function.
pub const AUTOTUNE_HANDLER: DeferredAction =
    DeferredAction::new("autotune-handler", append_autotune_handler);

fn require_aws_sdk(module: &mut Module, cx: &RunContext) -> Result<()> {
    let items = cx.builder.module_items(r#"const AWS = require("aws-sdk");"#)?;
    module.body.splice(0..0, items);
    Ok(())
}

fn append_invoke_lambda(module: &mut Module, cx: &RunContext) -> Result<()> {
    let region = cx
        .descriptor
        .provider_str("region")
        .unwrap_or(&cx.config.region);
    let items = cx
        .builder
        .module_items(&cloudfunction::invoke_lambda_helper(region)?)?;
    module.body.extend(items);
    Ok(())
}

fn append_autotune_handler(module: &mut Module, cx: &RunContext) -> Result<()> {
    let items = cx.builder.module_items(autotune::AUTOTUNE_HANDLER_SOURCE)?;
    module.body.extend(items);
    Ok(())
}
