pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use teleassist_core::config::{AppConfig, LoadOptions};

use crate::commands::ask::AskArgs;

#[derive(Debug, Parser)]
#[command(
    name = "teleassist",
    about = "Teleassist customer-service assistant CLI",
    long_about = "Ask the assistant as a caller, inspect accounts, and operate migrations, demo seed data, config and readiness checks.",
    after_help = "Examples:\n  teleassist ask --email jane.smith@email.com \"what's my bill?\"\n  teleassist account --email admin@telecom.com\n  teleassist doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Route a question through identity, classification and access control")]
    Ask {
        #[arg(long, help = "Caller email used to resolve role and account scope")]
        email: Option<String>,
        #[arg(long, help = "Channel hint (billing|network|plan|knowledge) that overrides text")]
        channel: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(required = true, num_args = 1.., help = "The question to ask")]
        query: Vec<String>,
    },
    #[command(about = "Show the resolved account view for an email as JSON")]
    Account {
        #[arg(long)]
        email: String,
    },
    #[command(about = "Verify credentials and report the caller's role")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic telecom demo dataset and verify it")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, DB connectivity, schema, seed data and documents")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging_from_env();

    let command_name = cli.command.name();
    let result = match cli.command {
        Command::Ask { email, channel, json, query } => {
            commands::ask::run(AskArgs { email, channel, json, query: query.join(" ") })
        }
        Command::Account { email } => commands::account::run(&email),
        Command::Login { email, password } => commands::login::run(&email, &password),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    tracing::debug!(
        event_name = "cli.command_finished",
        command = command_name,
        exit_code = result.exit_code,
        "command finished"
    );
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Ask { .. } => "ask",
            Self::Account { .. } => "account",
            Self::Login { .. } => "login",
            Self::Migrate => "migrate",
            Self::Seed => "seed",
            Self::Config => "config",
            Self::Doctor { .. } => "doctor",
        }
    }
}

/// Commands report config problems themselves, so a config that fails to load still gets
/// default logging here.
fn init_logging_from_env() {
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    logging::init_logging(&config.logging);
}
