//! List command - render one page of a URL state

use anyhow::Result;
use colored::Colorize;

use super::{get_context, Logger};
use crate::output;
use cashflow_core::services::{empty_state, FetchState};
use cashflow_core::{Filter, OperationResult, SearchParams};

/// Start from `url` and apply the explicit flags on top
///
/// Without a `limit` in either place the configured page size is used.
pub fn resolve_search(
    url: Option<&str>,
    filter: Option<Filter>,
    page: Option<u32>,
    limit: Option<u32>,
    default_limit: u32,
) -> SearchParams {
    let mut search = url.map(SearchParams::parse).unwrap_or_default();
    let url_has_limit = url.is_some_and(|u| u.contains("limit="));

    if let Some(filter) = filter {
        if filter != search.filter {
            search.page = 1;
        }
        search.filter = filter;
    }
    if let Some(page) = page.filter(|&p| p > 0) {
        search.page = page;
    }
    match limit.filter(|&l| l > 0) {
        Some(limit) => search.limit = limit,
        None if !url_has_limit && default_limit > 0 => search.limit = default_limit,
        None => {}
    }
    search
}

pub async fn run(
    url: Option<&str>,
    filter: Option<Filter>,
    page: Option<u32>,
    limit: Option<u32>,
    json: bool,
    logger: Logger,
) -> Result<()> {
    let ctx = get_context(logger)?;
    let search = resolve_search(url, filter, page, limit, ctx.config.page_size);

    let mut home = ctx.home(&search.to_string());
    let spinner = if json {
        indicatif::ProgressBar::hidden()
    } else {
        output::spinner("Loading transactions...")
    };
    home.load().await;
    spinner.finish_and_clear();

    let view = home.view();

    if json {
        let result: OperationResult<_> = match view.list {
            FetchState::Success(page) => OperationResult::ok(page),
            FetchState::Error(e) => OperationResult::fail(e.to_string()),
            FetchState::Pending => OperationResult::fail("request did not finish"),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output::print_tabs(view.filter);
    println!("{}", view.url.dimmed());
    println!();

    match &view.list {
        FetchState::Success(page) if page.is_empty() => {
            output::print_empty_state(&empty_state(view.filter));
        }
        FetchState::Success(page) => {
            output::print_transactions(page);
            if view.show_pagination {
                output::print_pagination(&view.pagination, view.page, page.total_pages);
            }
            println!(
                "{}",
                format!(
                    "{} transactions, page {} of {}",
                    page.total,
                    view.page,
                    page.total_pages.max(1)
                )
                .dimmed()
            );
        }
        FetchState::Error(e) => {
            anyhow::bail!("Could not load transactions: {}", e);
        }
        FetchState::Pending => {}
    }

    Ok(())
}
