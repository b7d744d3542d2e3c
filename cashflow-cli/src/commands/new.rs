//! New command - add a transaction through the form validator

use anyhow::{bail, Result};
use dialoguer::Input;

use super::{get_context, Logger};
use crate::output;
use cashflow_core::domain::validation::Field;
use cashflow_core::services::{SubmitOutcome, TransactionForm, TransactionService};
use cashflow_core::{OperationResult, TransactionType};

pub async fn run(
    amount: Option<String>,
    kind: TransactionType,
    json: bool,
    logger: Logger,
) -> Result<()> {
    let ctx = get_context(logger)?;

    // Get amount interactively if not provided
    let amount = match amount {
        Some(a) => a,
        None if !json && atty::is(atty::Stream::Stdin) => {
            let mut form = TransactionForm::new_entry(None, Some(kind));
            Input::<String>::new()
                .with_prompt(format!("{} amount", output::format_kind(kind)))
                .validate_with(|text: &String| -> std::result::Result<(), String> {
                    form.input_amount(text);
                    match form.validate() {
                        Ok(_) => Ok(()),
                        Err(errors) => Err(errors
                            .message_for(Field::Amount)
                            .unwrap_or("Invalid amount")
                            .to_string()),
                    }
                })
                .interact_text()?
        }
        None => bail!("An amount is required"),
    };

    let mut form = TransactionForm::new_entry(None, Some(kind));
    form.input_amount(&amount);
    submit(form, &ctx.transactions, json).await
}

/// Submit a filled form and report the outcome
pub async fn submit(
    mut form: TransactionForm,
    service: &TransactionService,
    json: bool,
) -> Result<()> {
    match form.submit(service).await {
        SubmitOutcome::Saved {
            transaction,
            notification,
        } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&OperationResult::ok(transaction))?);
            } else {
                output::print_notification(&notification);
                output::print_transaction(&transaction);
            }
            Ok(())
        }
        SubmitOutcome::Invalid(errors) => {
            let message = errors
                .message_for(Field::Amount)
                .or_else(|| errors.message_for(Field::Type))
                .unwrap_or("Invalid input");
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&OperationResult::<()>::fail(message))?
                );
            }
            bail!("{}", message)
        }
        SubmitOutcome::Failed {
            error,
            notification,
        } => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&OperationResult::<()>::fail(error.to_string()))?
                );
            } else {
                output::print_notification(&notification);
            }
            Err(error.into())
        }
    }
}
