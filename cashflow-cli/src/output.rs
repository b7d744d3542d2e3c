//! Output formatting utilities

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};

use cashflow_core::domain::currency::format_currency;
use cashflow_core::services::{EmptyState, Notification};
use cashflow_core::{Filter, Page, PageItem, Transaction, TransactionType};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Spinner shown while a request is pending; hidden when stdout is not a terminal
pub fn spinner(msg: &str) -> ProgressBar {
    if atty::isnt(atty::Stream::Stdout) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Signed, colored amount: outcomes are shown as negative
pub fn format_amount(kind: TransactionType, amount: i64) -> String {
    match kind {
        TransactionType::Income => format_currency(amount).green().to_string(),
        TransactionType::Outcome => format!("- {}", format_currency(amount)).red().to_string(),
    }
}

pub fn format_kind(kind: TransactionType) -> String {
    match kind {
        TransactionType::Income => "Income".green().to_string(),
        TransactionType::Outcome => "Outcome".red().to_string(),
    }
}

/// Local date and time of a timestamp
pub fn format_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

/// Tab bar with the active tab highlighted
pub fn print_tabs(active: Filter) {
    let tabs: Vec<String> = Filter::ALL
        .iter()
        .map(|f| {
            if *f == active {
                format!("[{}]", f.label()).bold().underline().to_string()
            } else {
                f.label().dimmed().to_string()
            }
        })
        .collect();
    println!("{}", tabs.join("  "));
}

/// One page of transactions as a table
pub fn print_transactions(page: &Page<Transaction>) {
    let mut table = create_table();
    table.set_header(vec!["ID", "Type", "Amount", "Created", "Status"]);

    for tx in &page.data {
        let status = match &tx.deleted_at {
            Some(at) => format!("deleted {}", format_time(at)).dimmed().to_string(),
            None => String::new(),
        };
        table.add_row(vec![
            Cell::new(&tx.id),
            Cell::new(format_kind(tx.kind)),
            Cell::new(format_amount(tx.kind, tx.amount)).set_alignment(CellAlignment::Right),
            Cell::new(format_time(&tx.created_at)),
            Cell::new(status),
        ]);
    }

    println!("{}", table);
}

/// Page buttons, e.g. `‹ 1 … 4 [5] 6 … 9 ›`
pub fn print_pagination(items: &[PageItem], current: u32, total_pages: u32) {
    let mut parts = Vec::with_capacity(items.len() + 2);
    parts.push(if current > 1 { "‹".normal() } else { "‹".dimmed() }.to_string());
    for item in items {
        parts.push(match item {
            PageItem::Page(p) if *p == current => format!("[{}]", p).bold().to_string(),
            PageItem::Page(p) => p.to_string(),
            PageItem::Ellipsis => "…".dimmed().to_string(),
        });
    }
    parts.push(if current < total_pages { "›".normal() } else { "›".dimmed() }.to_string());
    println!("{}", parts.join(" "));
}

pub fn print_empty_state(state: &EmptyState) {
    println!("{}", state.title.bold());
    println!("{}", state.description.dimmed());
}

pub fn print_notification(notification: &Notification) {
    let title = if notification.is_error() {
        notification.title.red().bold()
    } else {
        notification.title.green().bold()
    };
    match &notification.description {
        Some(description) => println!("{} {}", title, description.dimmed()),
        None => println!("{}", title),
    }
}

/// Vertical key/value table for one transaction
pub fn print_transaction(tx: &Transaction) {
    let mut table = create_table();
    table.add_row(vec!["ID".to_string(), tx.id.clone()]);
    table.add_row(vec!["Type".to_string(), format_kind(tx.kind)]);
    table.add_row(vec!["Amount".to_string(), format_amount(tx.kind, tx.amount)]);
    table.add_row(vec!["Created".to_string(), format_time(&tx.created_at)]);
    table.add_row(vec!["Updated".to_string(), format_time(&tx.updated_at)]);
    if let Some(at) = &tx.deleted_at {
        table.add_row(vec!["Deleted".to_string(), format_time(at)]);
    }
    println!("{}", table);
}
