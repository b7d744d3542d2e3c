//! Delete, restore and purge commands

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use super::{get_context, Logger};
use crate::output;
use cashflow_core::services::Notification;
use cashflow_core::OperationResult;

/// Soft delete: the transaction moves to the deleted tab
pub async fn run_delete(id: &str, json: bool, logger: Logger) -> Result<()> {
    let ctx = get_context(logger)?;
    let result = ctx.transactions.soft_delete(id).await;

    if json {
        let result: OperationResult<_> = result.into();
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    result?;
    output::print_notification(&Notification::deleted());
    Ok(())
}

pub async fn run_restore(id: &str, json: bool, logger: Logger) -> Result<()> {
    let ctx = get_context(logger)?;
    let result = ctx.transactions.restore(id).await;

    if json {
        let result: OperationResult<_> = result.into();
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    result?;
    output::print_notification(&Notification::restored());
    Ok(())
}

/// Permanent removal, not reachable from the regular screens
pub async fn run_purge(id: &str, force: bool, logger: Logger) -> Result<()> {
    let ctx = get_context(logger)?;
    let tx = ctx.transactions.get(id).await?;

    // Confirm removal unless --force
    if !force {
        println!("\n{}", "This permanently removes the transaction:".yellow());
        output::print_transaction(&tx);
        println!("{}\n", "It cannot be restored afterwards.".dimmed());

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    ctx.transactions.hard_delete(&tx.id).await?;
    println!("\n{} Transaction '{}' removed\n", "✓".green(), tx.id);

    Ok(())
}
