//! Browse command - interactive home page
//!
//! Every menu choice is a URL-state change on the home page view model, so
//! back/forward walk through the same history a browser would keep.

use std::future::Future;

use anyhow::{bail, Result};
use colored::Colorize;
use dialoguer::{Input, Select};

use super::list::resolve_search;
use super::{get_context, Logger};
use crate::output;
use cashflow_core::domain::currency::format_currency;
use cashflow_core::domain::query::PAGE_SIZE_OPTIONS;
use cashflow_core::services::{empty_state, FetchState, FormMode, HomePage, HomeView, RowAction};
use cashflow_core::{Filter, Transaction, TransactionType};

enum Action {
    Tab(Filter),
    Page(u32),
    PageSize(u32),
    New,
    Edit(String),
    Delete(String),
    Restore(String),
    Back,
    Forward,
    Refresh,
    Stay,
    Quit,
    Amount(String),
    Type(TransactionType),
    Submit,
    Close,
}

pub async fn run(url: Option<&str>, logger: Logger) -> Result<()> {
    if atty::isnt(atty::Stream::Stdin) {
        bail!("'cf browse' needs an interactive terminal; use 'cf list' instead");
    }

    let ctx = get_context(logger)?;
    let start = match url {
        Some(url) => url.to_string(),
        None => resolve_search(None, None, None, None, ctx.config.page_size).to_string(),
    };

    let mut home = ctx.home(&start);
    loading(home.load()).await;

    loop {
        render(&mut home);
        let view = home.view();
        let action = match &view.form {
            Some(_) => modal_menu(&view)?,
            None => list_menu(&view)?,
        };

        match action {
            Action::Tab(filter) => loading(home.select_filter(filter)).await,
            Action::Page(page) => loading(home.set_page(page)).await,
            Action::PageSize(limit) => loading(home.set_limit(limit)).await,
            Action::New => loading(home.open_new()).await,
            Action::Edit(id) => loading(home.open_edit(&id)).await,
            Action::Delete(id) => {
                // Failures are already queued as notifications
                let _ = loading(home.delete(&id)).await;
            }
            Action::Restore(id) => {
                let _ = loading(home.restore(&id)).await;
            }
            Action::Back => {
                loading(home.back()).await;
            }
            Action::Forward => {
                loading(home.forward()).await;
            }
            Action::Refresh => loading(home.refresh()).await,
            Action::Amount(text) => {
                home.input_amount(&text)?;
            }
            Action::Type(kind) => home.select_type(kind)?,
            // An invalid form stays open with its inline error
            Action::Submit => {
                loading(home.submit()).await?;
            }
            Action::Close => loading(home.close_modal()).await,
            Action::Stay => {}
            Action::Quit => break,
        }
    }

    Ok(())
}

/// Await `fut` behind a spinner
async fn loading<F: Future>(fut: F) -> F::Output {
    let pb = output::spinner("Loading...");
    let result = fut.await;
    pb.finish_and_clear();
    result
}

fn render(home: &mut HomePage) {
    let view = home.view();

    println!();
    output::print_tabs(view.filter);
    println!("{}", view.url.dimmed());
    println!();

    match &view.list {
        FetchState::Pending => println!("{}", "Loading...".dimmed()),
        FetchState::Error(e) => {
            output::error("Could not load transactions");
            println!("{}", e.to_string().dimmed());
        }
        FetchState::Success(page) if page.is_empty() => {
            output::print_empty_state(&empty_state(view.filter));
        }
        FetchState::Success(page) => {
            output::print_transactions(page);
            if view.show_pagination {
                output::print_pagination(&view.pagination, view.page, page.total_pages);
            }
        }
    }

    for notification in home.take_notifications() {
        output::print_notification(&notification);
    }

    if let Some(form) = &view.form {
        println!();
        let title = match form.mode() {
            FormMode::New => "New transaction".to_string(),
            FormMode::Edit(id) => format!("Edit transaction {}", id),
        };
        println!("{}", title.bold());
        println!("  Type:   {}", output::format_kind(form.kind()));
        println!("  Amount: R$ {}", form.amount());
        if let Some(message) = form.amount_error() {
            println!("          {}", message.red());
        }
    }
}

fn rows(view: &HomeView) -> &[Transaction] {
    view.list.data().map(|page| page.data.as_slice()).unwrap_or(&[])
}

fn total_pages(view: &HomeView) -> u32 {
    view.list.data().map(|page| page.total_pages).unwrap_or(0)
}

fn row_label(tx: &Transaction) -> String {
    format!("{}  {:<8} {}", tx.id, tx.kind.as_str(), format_currency(tx.amount))
}

/// Ask for a row; `None` when cancelled
fn pick_row(prompt: &str, rows: &[Transaction]) -> Result<Option<String>> {
    let labels: Vec<String> = rows.iter().map(row_label).collect();
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(choice.map(|i| rows[i].id.clone()))
}

#[derive(Clone, Copy)]
enum Entry {
    SwitchTab,
    NextPage,
    PreviousPage,
    GoToPage,
    PageSize,
    New,
    Edit,
    Delete,
    Restore,
    Back,
    Forward,
    Refresh,
    Quit,
}

fn list_menu(view: &HomeView) -> Result<Action> {
    let rows = rows(view);
    let pages = total_pages(view);

    let mut items: Vec<(&str, Entry)> = vec![("Switch tab", Entry::SwitchTab)];
    if view.page < pages {
        items.push(("Next page", Entry::NextPage));
    }
    if view.page > 1 {
        items.push(("Previous page", Entry::PreviousPage));
    }
    if view.show_pagination {
        items.push(("Go to page", Entry::GoToPage));
    }
    items.push(("Page size", Entry::PageSize));
    items.push(("New transaction", Entry::New));
    if !rows.is_empty() {
        match view.row_action {
            RowAction::Delete => {
                items.push(("Edit a transaction", Entry::Edit));
                items.push(("Delete a transaction", Entry::Delete));
            }
            RowAction::Restore => items.push(("Restore a transaction", Entry::Restore)),
        }
    }
    if view.can_go_back {
        items.push(("Back", Entry::Back));
    }
    if view.can_go_forward {
        items.push(("Forward", Entry::Forward));
    }
    items.push(("Refresh", Entry::Refresh));
    items.push(("Quit", Entry::Quit));

    let labels: Vec<&str> = items.iter().map(|(label, _)| *label).collect();
    let Some(choice) = Select::new()
        .with_prompt("What next?")
        .items(&labels)
        .default(0)
        .interact_opt()?
    else {
        return Ok(Action::Quit);
    };

    let action = match items[choice].1 {
        Entry::SwitchTab => {
            let labels: Vec<&str> = Filter::ALL.iter().map(|f| f.label()).collect();
            let current = Filter::ALL.iter().position(|f| *f == view.filter).unwrap_or(0);
            match Select::new()
                .with_prompt("Tab")
                .items(&labels)
                .default(current)
                .interact_opt()?
            {
                Some(i) => Action::Tab(Filter::ALL[i]),
                None => Action::Stay,
            }
        }
        Entry::NextPage => Action::Page(view.page + 1),
        Entry::PreviousPage => Action::Page(view.page - 1),
        Entry::GoToPage => {
            let page: u32 = Input::new()
                .with_prompt(format!("Page (1-{})", pages))
                .validate_with(|p: &u32| -> std::result::Result<(), String> {
                    if (1..=pages).contains(p) {
                        Ok(())
                    } else {
                        Err(format!("Choose a page between 1 and {}", pages))
                    }
                })
                .interact_text()?;
            Action::Page(page)
        }
        Entry::PageSize => {
            let labels: Vec<String> = PAGE_SIZE_OPTIONS.iter().map(|n| n.to_string()).collect();
            let current = PAGE_SIZE_OPTIONS
                .iter()
                .position(|&n| n == view.limit)
                .unwrap_or(0);
            match Select::new()
                .with_prompt("Rows per page")
                .items(&labels)
                .default(current)
                .interact_opt()?
            {
                Some(i) => Action::PageSize(PAGE_SIZE_OPTIONS[i]),
                None => Action::Stay,
            }
        }
        Entry::New => Action::New,
        Entry::Edit => pick_row("Edit", rows)?.map_or(Action::Stay, Action::Edit),
        Entry::Delete => pick_row("Delete", rows)?.map_or(Action::Stay, Action::Delete),
        Entry::Restore => pick_row("Restore", rows)?.map_or(Action::Stay, Action::Restore),
        Entry::Back => Action::Back,
        Entry::Forward => Action::Forward,
        Entry::Refresh => Action::Refresh,
        Entry::Quit => Action::Quit,
    };
    Ok(action)
}

fn modal_menu(view: &HomeView) -> Result<Action> {
    let Some(form) = &view.form else {
        return Ok(Action::Stay);
    };

    let items = ["Amount", "Type", "Save", "Cancel"];
    let Some(choice) = Select::new()
        .with_prompt("Form")
        .items(&items)
        .default(0)
        .interact_opt()?
    else {
        return Ok(Action::Close);
    };

    let action = match choice {
        0 => {
            let text: String = Input::new()
                .with_prompt("Amount (R$)")
                .with_initial_text(form.amount())
                .allow_empty(true)
                .interact_text()?;
            Action::Amount(text)
        }
        1 => {
            let kinds = [TransactionType::Income, TransactionType::Outcome];
            let labels = ["Income", "Outcome"];
            let current = kinds.iter().position(|k| *k == form.kind()).unwrap_or(0);
            match Select::new()
                .with_prompt("Type")
                .items(&labels)
                .default(current)
                .interact_opt()?
            {
                Some(i) => Action::Type(kinds[i]),
                None => Action::Type(form.kind()),
            }
        }
        2 => Action::Submit,
        _ => Action::Close,
    };
    Ok(action)
}
