//! `@httpapi(method=GET, path=/users)`: expose a function through an HTTP API route.

use anyhow::{Result, bail};

use crate::core::annotations::Annotation;
use crate::core::context::RunContext;
use crate::core::descriptor::{EventSpec, FunctionSpec, HttpApiEvent};
use crate::core::registry::NodeContext;

use super::target::FunctionTarget;

/// Any method.
pub const DEFAULT_METHOD: &str = "*";

pub fn add_route(annotation: &Annotation, node: &mut NodeContext<'_>, cx: &mut RunContext) -> Result<()> {
    let Some(stmt) = node.stmt_mut() else {
        bail!("@httpapi only applies to declarations");
    };
    let name = FunctionTarget::from_stmt(stmt)?.name;

    let method = annotation.param("method").unwrap_or(DEFAULT_METHOD).to_string();
    let path = annotation
        .param("path")
        .map(str::to_string)
        .unwrap_or_else(|| format!("/{}", name));

    cx.descriptor.add_function_spec(
        &name,
        FunctionSpec {
            events: vec![EventSpec::HttpApi(HttpApiEvent { method, path })],
            ..Default::default()
        },
    );
    Ok(())
}
