use clap::Parser;

mod args;
mod cmd;
mod commands;
mod executors;
mod exit_codes;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "conveyor", version, about = "Conveyor pipeline runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate { path, output } => cmd::validate::validate_cmd(&path, output).await,
        Command::Inspect { path, output } => cmd::inspect::inspect_cmd(&path, output).await,
        Command::Run {
            path,
            trigger,
            behavior,
            output,
        } => cmd::run::run_cmd(&path, trigger, behavior, output).await,
    }
}
