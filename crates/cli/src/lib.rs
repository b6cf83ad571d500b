pub mod commands;

use clap::{Parser, Subcommand};
use commands::CommandResult;
use std::process::ExitCode;

/// Parses arguments, executes the selected subcommand, prints its output,
/// and maps the outcome onto the process exit code.
pub fn run() -> ExitCode {
    let result = Cli::parse().command.execute();
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[derive(Debug, Parser)]
#[command(name = "timeclerk")]
#[command(version)]
#[command(about = "Timeclerk operator CLI")]
#[command(long_about = "Operate timeclerk database migrations, demo fixtures, readiness checks, \
                        and config inspection.")]
#[command(
    after_help = "Examples:\n  timeclerk migrate\n  timeclerk seed\n  timeclerk doctor --json\n  timeclerk config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Migrate, then load the idempotent demo dataset of accounts and timesheets")]
    Seed,
    #[command(
        about = "Check config validity, database connectivity, migration status, and notifier setup"
    )]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

impl Command {
    fn execute(self) -> CommandResult {
        match self {
            Command::Migrate => commands::migrate::run(),
            Command::Seed => commands::seed::run(),
            Command::Doctor { json } => {
                CommandResult { exit_code: 0, output: commands::doctor::run(json) }
            }
            Command::Config => CommandResult { exit_code: 0, output: commands::config::run() },
        }
    }
}
