//! Edit command - change amount or type through the form validator

use anyhow::{bail, Result};

use super::new::submit;
use super::{get_context, Logger};
use cashflow_core::services::TransactionForm;
use cashflow_core::TransactionType;

pub async fn run(
    id: &str,
    amount: Option<&str>,
    kind: Option<TransactionType>,
    json: bool,
    logger: Logger,
) -> Result<()> {
    if amount.is_none() && kind.is_none() {
        bail!("Nothing to change: pass --amount and/or --type");
    }

    let ctx = get_context(logger)?;
    let tx = ctx.transactions.get(id).await?;

    let mut form = TransactionForm::edit(&tx);
    if let Some(amount) = amount {
        form.input_amount(amount);
    }
    if let Some(kind) = kind {
        form.select_type(kind);
    }

    submit(form, &ctx.transactions, json).await
}
