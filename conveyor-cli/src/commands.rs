use std::path::PathBuf;

use clap::Subcommand;

use crate::{OutputArgs, RunBehaviorArgs, TriggerArgs};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and validate a pipeline definition.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the stage graph of a definition.
    Inspect {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Execute a definition locally against an object-arrival event.
    Run {
        path: PathBuf,
        #[command(flatten)]
        trigger: TriggerArgs,
        #[command(flatten)]
        behavior: RunBehaviorArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}
