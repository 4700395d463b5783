//! Command-line interface layer.

use std::process::ExitCode;

use anyhow::Result;

mod args;
mod commands;
mod exit_status;
mod report;
mod run;

pub use args::{Arguments, Command, InitCommand, SynthCommand};
pub use exit_status::ExitStatus;
pub use report::{
    print_functions_to, print_module_written_to, print_synth_success_to, print_warnings_to,
};

pub fn run_cli(args: Arguments) -> Result<ExitCode> {
    let Some(args) = args.with_command_or_help() else {
        return Ok(ExitStatus::Success.into());
    };

    Ok(run::run(args)?.into())
}
