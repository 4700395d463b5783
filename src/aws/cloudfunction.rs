//! `@cloudfunction`: turn a function into a deployable Lambda function.
//!
//! The declaration is registered in the descriptor and rewritten into a
//! CommonJS export:
//!
//! ```js
//! // @cloudfunction(memory=256)
//! function resize(image) { return image; }
//! // becomes
//! exports.resize = async (image) => { return image; };
//! ```
//!
//! Calls to a registered function anywhere later in the module are replaced
//! with an awaited remote invocation through the `invokeLambda` helper.

use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde_json::json;
use swc_common::DUMMY_SP;
use swc_ecma_ast::{ArrayLit, Callee, Expr, ExprOrSpread};

use crate::core::annotations::Annotation;
use crate::core::builder::arg;
use crate::core::context::RunContext;
use crate::core::descriptor::FunctionSpec;
use crate::core::registry::NodeContext;
use crate::diagnostics::WarningKind;

use super::target::FunctionTarget;
use super::{AWS_SDK, INVOKE_LAMBDA};

pub fn export_declaration(
    annotation: &Annotation,
    node: &mut NodeContext<'_>,
    cx: &mut RunContext,
) -> Result<()> {
    let Some(stmt) = node.stmt_mut() else {
        bail!("@cloudfunction only applies to declarations");
    };
    let target = FunctionTarget::from_stmt(stmt)?;
    let name = target.name.clone();

    let spec = FunctionSpec {
        handler: Some(cx.handler_reference(&name)),
        memory_size: annotation.positive_int("memory"),
        timeout: annotation.positive_int("timeout"),
        ..Default::default()
    };
    cx.descriptor.add_function_spec(&name, spec);

    let (params, body) = target.take_parts();
    let b = &cx.builder;
    let export = b.assign(b.member(b.ident("exports"), &name), b.arrow(params, body, true));
    *stmt = b.expr_stmt(export);
    Ok(())
}

/// Generic call handler: rewrite calls to registered functions into remote invocations.
pub fn invoke_remote(node: &mut NodeContext<'_>, cx: &mut RunContext) -> Result<()> {
    let Some(name) = node.expr_mut().and_then(|expr| callee_name(expr)) else {
        return Ok(());
    };
    if !cx.descriptor.has_function(&name) {
        return Ok(());
    }
    if !node.can_await() {
        cx.warn(WarningKind::RemoteCallNotAwaitable { callee: name }, node.position);
        return Ok(());
    }

    let b = &cx.builder;
    let function_id = b.string(&format!("{}-{}-{}", cx.config.service, cx.config.stage, name))?;
    let Some(Expr::Call(call)) = node.expr_mut() else {
        return Ok(());
    };
    let payload = payload(std::mem::take(&mut call.args));

    let stringify = b.call(Expr::Member(b.member(b.ident("JSON"), "stringify")), vec![arg(payload)]);
    let invoke = b.call(b.ident("invokeLambda"), vec![arg(function_id), arg(stringify)]);
    let replacement = b.call(
        Expr::Member(b.member(b.ident("JSON"), "parse")),
        vec![arg(b.await_expr(invoke))],
    );

    if let Some(expr) = node.expr_mut() {
        *expr = replacement;
    }
    node.mark_enclosing_async();

    cx.descriptor.add_provider_config(invoke_policy());
    cx.defer(AWS_SDK);
    cx.defer(INVOKE_LAMBDA);
    Ok(())
}

fn callee_name(expr: &Expr) -> Option<String> {
    let Expr::Call(call) = expr else {
        return None;
    };
    match &call.callee {
        Callee::Expr(callee) => match &**callee {
            Expr::Ident(ident) => Some(ident.sym.to_string()),
            _ => None,
        },
        _ => None,
    }
}

// A single plain argument is sent as is, anything else as an array.
fn payload(mut args: Vec<ExprOrSpread>) -> Expr {
    if args.len() == 1
        && args[0].spread.is_none()
        && let Some(single) = args.pop()
    {
        return *single.expr;
    }
    Expr::Array(ArrayLit {
        span: DUMMY_SP,
        elems: args.into_iter().map(Some).collect(),
    })
}

fn invoke_policy() -> IndexMap<String, serde_json::Value> {
    IndexMap::from([(
        "iam".to_string(),
        json!({
            "role": {
                "statements": [{
                    "Effect": "Allow",
                    "Action": ["lambda:InvokeFunction"],
                    "Resource": "*"
                }]
            }
        }),
    )])
}

/// `invokeLambda` helper appended once to modules with remote calls.
pub fn invoke_lambda_helper(region: &str) -> Result<String> {
    Ok(format!(
        r#"const invokeLambda = async (functionName, payload) => {{
  const lambda = new AWS.Lambda({{ region: {} }});
  try {{
    return (await lambda.invoke({{ FunctionName: functionName, Payload: payload }}).promise()).Payload;
  }} catch {{
    console.error("Error invoking function " + functionName);
    return "Error";
  }}
}};"#,
        serde_json::to_string(region)?
    ))
}
