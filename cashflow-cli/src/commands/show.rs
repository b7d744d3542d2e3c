//! Show command - a single transaction

use anyhow::Result;

use super::{get_context, Logger};
use crate::output;
use cashflow_core::OperationResult;

pub async fn run(id: &str, json: bool, logger: Logger) -> Result<()> {
    let ctx = get_context(logger)?;
    let result = ctx.transactions.get(id).await;

    if json {
        let result: OperationResult<_> = result.into();
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output::print_transaction(&result?);
    Ok(())
}
