use std::process::ExitCode;

/// Process exit status of a fusion command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// The command completed; warnings do not change the status.
    Success = 0,
    /// The command refused to run, e.g. `init` over an existing config file.
    Failure = 1,
    /// Configuration, parse or I/O error.
    Error = 2,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}
