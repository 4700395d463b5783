//! Report formatting and printing utilities.
//!
//! Warnings are printed cargo-style to stderr, results to stdout. Every
//! printer has a `*_to` variant taking a writer so output can be tested.

use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;

use crate::core::descriptor::{Descriptor, EventSpec, FunctionSpec};
use crate::diagnostics::Warning;

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

pub fn print_warnings(warnings: &[Warning]) {
    print_warnings_to(warnings, &mut io::stderr().lock());
}

pub fn print_warnings_to<W: Write>(warnings: &[Warning], writer: &mut W) {
    for warning in warnings {
        let _ = writeln!(writer, "{} {}", "warning:".bold().yellow(), warning.kind);
        if let Some(location) = &warning.location {
            let _ = writeln!(writer, "  {} {}", "-->".blue(), location);
        }
    }
}

pub fn print_synth_success(descriptor: &Descriptor, output: &Path, warning_count: usize) {
    print_synth_success_to(descriptor, output, warning_count, &mut io::stdout().lock());
}

pub fn print_synth_success_to<W: Write>(
    descriptor: &Descriptor,
    output: &Path,
    warning_count: usize,
    writer: &mut W,
) {
    let functions = descriptor.functions.len();
    let mut msg = format!(
        "Synthesized {} {} into {}",
        functions,
        if functions == 1 { "function" } else { "functions" },
        output.display()
    );
    if warning_count > 0 {
        msg.push_str(&format!(
            " ({} {})",
            warning_count,
            if warning_count == 1 { "warning" } else { "warnings" }
        ));
    }
    let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), msg.green());
}

pub fn print_module_written(path: &Path) {
    print_module_written_to(path, &mut io::stdout().lock());
}

pub fn print_module_written_to<W: Write>(path: &Path, writer: &mut W) {
    let msg = format!("Wrote transformed module to {}", path.display());
    let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), msg.green());
}

/// Per-function details, printed with `-v`.
pub fn print_functions(descriptor: &Descriptor) {
    print_functions_to(descriptor, &mut io::stdout().lock());
}

pub fn print_functions_to<W: Write>(descriptor: &Descriptor, writer: &mut W) {
    for (name, spec) in &descriptor.functions {
        let _ = writeln!(writer, "  {} {}", name.bold(), describe_function(spec).dimmed());
        for event in &spec.events {
            let _ = writeln!(writer, "    {} {}", "-".dimmed(), describe_event(event));
        }
    }
    if !descriptor.resources.is_empty() {
        let _ = writeln!(
            writer,
            "  {} {}",
            "resources:".bold(),
            descriptor
                .resources
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

fn describe_function(spec: &FunctionSpec) -> String {
    let mut parts = Vec::new();
    if let Some(handler) = &spec.handler {
        parts.push(handler.clone());
    }
    if let Some(memory) = spec.memory_size {
        parts.push(format!("{} MB", memory));
    }
    if let Some(timeout) = spec.timeout {
        parts.push(format!("{}s", timeout));
    }
    if let Some(role) = &spec.role {
        parts.push(format!("role {}", role));
    }
    parts.join(", ")
}

fn describe_event(event: &EventSpec) -> String {
    match event {
        EventSpec::Schedule(schedule) => format!("schedule {}", schedule.rate),
        EventSpec::HttpApi(route) => format!("httpApi {} {}", route.method, route.path),
        EventSpec::Sns(topic) => format!("sns {}", topic),
    }
}
