pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "querystream",
    about = "QueryStream operator CLI",
    long_about = "Inspect configuration, check readiness, and exercise the chat routing pipeline without running the server.",
    after_help = "Examples:\n  querystream doctor --json\n  querystream config\n  querystream classify \"What's the weather like?\"\n  querystream ask \"How much does the starter package cost?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, generation credential, and domain knowledge")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show the domain filter verdict for a message and the step that decided it")]
    Classify {
        #[arg(help = "Message text to classify")]
        message: String,
    },
    #[command(about = "Resolve one message end to end and print the reply with its outcome")]
    Ask {
        #[arg(help = "Message text to send")]
        message: String,
    },
}

pub fn run() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Classify { message } => commands::classify::run(&message),
        Command::Ask { message } => commands::ask::run(&message),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
