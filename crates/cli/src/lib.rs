pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "concierge",
    about = "Concierge operator CLI",
    long_about = "Operate Concierge migrations, config inspection, readiness checks, and offline conversation simulation.",
    after_help = "Examples:\n  concierge doctor --json\n  concierge config\n  concierge simulate \"hi there\" \"can I book a table for 4?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, platform token readiness, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Run a scripted conversation through the routing engine with in-memory doubles",
        long_about = "Feed messages through the full routing pipeline without any external service. \
                      Messages are guest turns by default; prefix one with `staff:` to send it as \
                      a staff turn (for example `staff:@botoff 30`)."
    )]
    Simulate {
        #[arg(required = true, help = "Messages to send, in order")]
        messages: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Simulate { messages } => commands::simulate::run(&messages),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
