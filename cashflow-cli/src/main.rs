//! Cashflow CLI - income and outcome tracking in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use cashflow_core::services::logging::events;
use cashflow_core::services::{EntryPoint, LogEvent};
use cashflow_core::{Filter, TransactionType};
use commands::{browse, demo, edit, get_logger, list, log_event, logs, new, remove, show};

/// Cashflow - income and outcome tracking in your terminal
#[derive(Parser)]
#[command(name = "cf", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List transactions for a URL state
    List {
        /// URL or query string, e.g. "/?filter=income&page=2"
        url: Option<String>,
        /// Filter tab (all, income, outcome, deleted)
        #[arg(long)]
        filter: Option<Filter>,
        /// Page number
        #[arg(long)]
        page: Option<u32>,
        /// Page size
        #[arg(long)]
        limit: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single transaction
    Show {
        /// Transaction ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a transaction
    New {
        /// Amount as typed: "1.500,00" is R$ 1.500,00, bare digits are cents so
        /// "150000" is also R$ 1.500,00 and "1500" is R$ 15,00 (prompted when omitted)
        amount: Option<String>,
        /// Transaction type (income, outcome)
        #[arg(long = "type", short = 't', default_value = "income")]
        kind: TransactionType,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change the amount or type of a transaction
    Edit {
        /// Transaction ID
        id: String,
        /// New amount as typed; bare digits are cents ("1500" is R$ 15,00)
        #[arg(long)]
        amount: Option<String>,
        /// New transaction type
        #[arg(long = "type", short = 't')]
        kind: Option<TransactionType>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a transaction to the deleted tab
    Delete {
        /// Transaction ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bring a deleted transaction back
    Restore {
        /// Transaction ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Permanently remove a transaction (development only)
    #[command(hide = true)]
    Purge {
        /// Transaction ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Browse transactions interactively
    Browse {
        /// URL to start from
        url: Option<String>,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::List { .. } => "list",
            Commands::Show { .. } => "show",
            Commands::New { .. } => "new",
            Commands::Edit { .. } => "edit",
            Commands::Delete { .. } => "delete",
            Commands::Restore { .. } => "restore",
            Commands::Purge { .. } => "purge",
            Commands::Browse { .. } => "browse",
            Commands::Demo { .. } => "demo",
            Commands::Logs { .. } => "logs",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let name = cli.command.name();
    let entry_point = if matches!(cli.command, Commands::Browse { .. }) {
        EntryPoint::Browse
    } else {
        EntryPoint::Cli
    };
    let logger = get_logger(entry_point);

    let result = run(cli, logger.clone()).await;

    let event = LogEvent::new(events::COMMAND_EXECUTED).with_command(name);
    match result {
        Ok(()) => {
            log_event(&logger, event);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_event(&logger, event.with_error(e.to_string()));
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, logger: commands::Logger) -> Result<()> {
    match cli.command {
        Commands::List {
            url,
            filter,
            page,
            limit,
            json,
        } => list::run(url.as_deref(), filter, page, limit, json, logger).await,
        Commands::Show { id, json } => show::run(&id, json, logger).await,
        Commands::New { amount, kind, json } => new::run(amount, kind, json, logger).await,
        Commands::Edit {
            id,
            amount,
            kind,
            json,
        } => edit::run(&id, amount.as_deref(), kind, json, logger).await,
        Commands::Delete { id, json } => remove::run_delete(&id, json, logger).await,
        Commands::Restore { id, json } => remove::run_restore(&id, json, logger).await,
        Commands::Purge { id, force } => remove::run_purge(&id, force, logger).await,
        Commands::Browse { url } => browse::run(url.as_deref(), logger).await,
        Commands::Demo { command } => demo::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashflow_core::services::TransactionForm;
    use clap::CommandFactory;

    fn amount_help(command: &str, arg: &str) -> String {
        let cli = Cli::command();
        let sub = cli.find_subcommand(command).unwrap();
        let amount = sub.get_arguments().find(|a| a.get_id() == arg).unwrap();
        amount.get_help().unwrap().to_string()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_amount_help_says_bare_digits_are_cents() {
        assert!(amount_help("new", "amount").contains("cents"));
        assert!(amount_help("edit", "amount").contains("cents"));
    }

    #[test]
    fn test_bare_digits_are_read_as_cents() {
        let cli = Cli::try_parse_from(["cf", "new", "1500"]).unwrap();
        let Commands::New { amount, .. } = cli.command else {
            panic!("expected the new command");
        };

        let mut form = TransactionForm::new_entry(None, None);
        assert_eq!(form.input_amount(&amount.unwrap()), "15,00");
    }
}
