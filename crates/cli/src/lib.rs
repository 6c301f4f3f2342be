pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "replybot",
    about = "Replybot operator CLI",
    long_about = "Inspect replybot configuration, check Telegram readiness, and preview replies offline.",
    after_help = "Examples:\n  replybot doctor --json\n  replybot config\n  replybot reply \"what services do you offer?\"\n  replybot reply --command contact --variant 0"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(about = "Check classifier and catalog behaviour offline with per-check timings")]
    Smoke,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, response templates, and Telegram token readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Preview the reply the bot would send for a message, as JSON")]
    Reply {
        #[arg(long, help = "Treat the message as this bot command (e.g. `services`)")]
        command: Option<String>,
        #[arg(long, help = "Pick this response variant instead of a random one")]
        variant: Option<usize>,
        #[arg(help = "Message text")]
        text: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Reply { command, variant, text } => {
            let text = if text.is_empty() { None } else { Some(text.join(" ")) };
            commands::reply::run(commands::reply::ReplyArgs { command, variant, text })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
