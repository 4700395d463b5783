//! `@warmup(rate=N, eventKey=key)`: keep a function warm with scheduled pings.

use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde_json::Value;

use crate::core::annotations::Annotation;
use crate::core::context::RunContext;
use crate::core::descriptor::{EventSpec, FunctionSpec, ScheduleEvent};
use crate::core::registry::NodeContext;
use crate::utils::is_identifier;

use super::target::FunctionTarget;

pub const DEFAULT_RATE: u32 = 5;
pub const DEFAULT_EVENT_KEY: &str = "warmup";
const DEFAULT_EVENT_PARAM: &str = "event";

pub fn schedule_warmup(
    annotation: &Annotation,
    node: &mut NodeContext<'_>,
    cx: &mut RunContext,
) -> Result<()> {
    let Some(stmt) = node.stmt_mut() else {
        bail!("@warmup only applies to declarations");
    };
    let mut target = FunctionTarget::from_stmt(stmt)?;

    let rate = annotation.positive_int("rate").unwrap_or(DEFAULT_RATE);
    let event_key = annotation
        .param("eventkey")
        .filter(|key| is_identifier(key))
        .unwrap_or(DEFAULT_EVENT_KEY);

    let event_param = match target.first_param_name()? {
        Some(name) => name,
        None => {
            target.push_param(DEFAULT_EVENT_PARAM);
            DEFAULT_EVENT_PARAM.to_string()
        }
    };
    let guard = cx.builder.statements(&format!(
        "if ({}.{}) {{\n  return \"Warming up...\";\n}}",
        event_param, event_key
    ))?;
    target.prepend(guard);

    let event = EventSpec::Schedule(ScheduleEvent {
        rate: rate_expression(rate),
        input: IndexMap::from([(event_key.to_string(), Value::Bool(true))]),
    });
    cx.descriptor.add_function_spec(
        &target.name,
        FunctionSpec {
            events: vec![event],
            ..Default::default()
        },
    );
    Ok(())
}

/// Schedule expression for a rate in minutes, e.g. `rate(1 minute)` or `rate(10 minutes)`.
pub fn rate_expression(minutes: u32) -> String {
    let unit = if minutes > 1 { "minutes" } else { "minute" };
    format!("rate({} {})", minutes, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_expression() {
        assert_eq!(rate_expression(1), "rate(1 minute)");
        assert_eq!(rate_expression(5), "rate(5 minutes)");
        assert_eq!(rate_expression(10), "rate(10 minutes)");
    }
}
