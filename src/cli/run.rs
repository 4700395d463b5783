use anyhow::{Result, bail};

use super::{
    args::{Arguments, Command},
    commands::{init::init, synth::synth},
    exit_status::ExitStatus,
};

/// Dispatch to the command handler.
///
/// Commands report their own output; an `Err` means the command could not
/// run at all (missing config, unreadable or unparsable source).
pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    match command {
        Some(Command::Synth(cmd)) => synth(cmd),
        Some(Command::Init(cmd)) => init(cmd),
        None => bail!("No command provided. Use --help to see available commands."),
    }
}
