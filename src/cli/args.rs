//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `synth`: Transform a module and write its deployment descriptor
//! - `init`: Initialize the fusion configuration file

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Args)]
pub struct SynthCommand {
    /// JavaScript or TypeScript module to transform
    pub file: PathBuf,

    /// Descriptor output path (default: serverless.yml in the project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory to search for fusion.config.json (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Directory to create the configuration in (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Transform annotated functions and synthesize the deployment descriptor
    Synth(SynthCommand),
    /// Initialize a new fusion.config.json configuration file
    Init(InitCommand),
}
