use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// The object-arrival event seeding the run, either inline or from a file.
#[derive(Debug, Args, Clone)]
pub struct TriggerArgs {
    #[arg(long, value_name = "BUCKET")]
    pub source_bucket: Option<String>,
    #[arg(long, value_name = "KEY")]
    pub source_key: Option<String>,
    /// JSON file with `{"sourceBucket": ..., "sourceKey": ...}`.
    #[arg(long, conflicts_with_all = ["source_bucket", "source_key"])]
    pub event: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RunBehaviorArgs {
    /// Register an echo executor for every reference in the definition
    /// instead of the built-in simulated executors.
    #[arg(long)]
    pub echo: bool,
    /// Inject failures: STAGE=CLASSIFICATION[:TIMES]. With TIMES the stage
    /// recovers after that many failed attempts; without it, it always fails.
    #[arg(long = "fail", value_name = "STAGE=CLASS[:N]")]
    pub fail: Vec<String>,
}
