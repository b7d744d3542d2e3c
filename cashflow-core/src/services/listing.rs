//! Listing strategies
//!
//! A page is obtained either by asking the backend for it directly (when the
//! backend claims pagination support) or by fetching the type-filtered set
//! and paginating locally.
//!
//! Before the first direct page, [`ServerPaging`] checks once that the
//! backend really applies the soft-delete predicate: a one-row sample of the
//! active and deleted scopes must hold only matching records and their totals
//! must add up to the unscoped total. Every direct page is also checked for a
//! total, its size and the predicate. The first failed check switches the
//! service to local pagination for good, so a session never mixes both.

use std::fmt;
use std::sync::OnceLock;

use tokio::sync::OnceCell;

use crate::domain::query::{paginate, sort_newest_first, DeletedScope};
use crate::domain::result::Result;
use crate::domain::{ListQuery, Page, Transaction};
use crate::ports::{ListRequest, ListResponse, PageRequest, TransactionApi};

/// Why server pagination was not trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    MissingTotal,
    Oversized { returned: usize, limit: u32 },
    PredicateIgnored,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::MissingTotal => write!(f, "backend reported no total"),
            FallbackReason::Oversized { returned, limit } => {
                write!(f, "backend returned {} rows for a page of {}", returned, limit)
            }
            FallbackReason::PredicateIgnored => {
                write!(f, "backend ignored the soft-delete predicate")
            }
        }
    }
}

/// A page plus how it was obtained
#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub page: Page<Transaction>,
    /// Set only on the request that found the backend unreliable
    pub fallback: Option<FallbackReason>,
}

/// Trust in the backend's own pagination, decided once per service
#[derive(Debug, Default)]
pub struct ServerPaging {
    checked: OnceCell<Option<FallbackReason>>,
    distrusted: OnceLock<FallbackReason>,
}

impl ServerPaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Why server pagination was given up, if it was
    pub fn distrusted(&self) -> Option<FallbackReason> {
        self.distrusted.get().copied()
    }

    /// Fetch one page of `query` from `api`
    pub async fn fetch_page(
        &self,
        api: &dyn TransactionApi,
        query: &ListQuery,
    ) -> Result<ListOutcome> {
        if !api.can_paginate() || self.distrusted().is_some() {
            return Ok(ListOutcome {
                page: fetch_full(api, query).await?,
                fallback: None,
            });
        }

        let verdict = self
            .checked
            .get_or_try_init(|| check_predicates(api))
            .await?;
        if let Some(reason) = *verdict {
            return self.fall_back(api, query, reason).await;
        }

        let response = api.list(&ListRequest::paged(query)).await?;
        match check_page(&response, query) {
            Ok(total) => {
                let mut records = response.records;
                sort_newest_first(&mut records);
                Ok(ListOutcome {
                    page: Page::new(records, total, query.page, query.limit),
                    fallback: None,
                })
            }
            Err(reason) => self.fall_back(api, query, reason).await,
        }
    }

    async fn fall_back(
        &self,
        api: &dyn TransactionApi,
        query: &ListQuery,
        reason: FallbackReason,
    ) -> Result<ListOutcome> {
        let first = self.distrusted.set(reason).is_ok();
        Ok(ListOutcome {
            page: fetch_full(api, query).await?,
            fallback: first.then_some(reason),
        })
    }
}

/// Total of a direct page, or why it cannot be used
fn check_page(
    response: &ListResponse,
    query: &ListQuery,
) -> std::result::Result<u64, FallbackReason> {
    let total = response.total.ok_or(FallbackReason::MissingTotal)?;
    if response.records.len() > query.limit as usize {
        return Err(FallbackReason::Oversized {
            returned: response.records.len(),
            limit: query.limit,
        });
    }
    if !response.records.iter().all(|tx| query.filter.matches(tx)) {
        return Err(FallbackReason::PredicateIgnored);
    }
    Ok(total)
}

/// Sample each soft-delete scope once and compare the totals
async fn check_predicates(api: &dyn TransactionApi) -> Result<Option<FallbackReason>> {
    let sample = |scope| ListRequest {
        kind: None,
        scope,
        page: Some(PageRequest { page: 1, limit: 1 }),
    };
    let everything = api.list(&sample(None)).await?;
    let active = api.list(&sample(Some(DeletedScope::ActiveOnly))).await?;
    let deleted = api.list(&sample(Some(DeletedScope::OnlyDeleted))).await?;

    let (Some(all_total), Some(active_total), Some(deleted_total)) =
        (everything.total, active.total, deleted.total)
    else {
        return Ok(Some(FallbackReason::MissingTotal));
    };
    if let Some(returned) = [&everything, &active, &deleted]
        .iter()
        .map(|r| r.records.len())
        .find(|&n| n > 1)
    {
        return Ok(Some(FallbackReason::Oversized { returned, limit: 1 }));
    }

    let scoped =
        |r: &ListResponse, scope: DeletedScope| r.records.iter().all(|tx| scope.matches(tx));
    if !scoped(&active, DeletedScope::ActiveOnly)
        || !scoped(&deleted, DeletedScope::OnlyDeleted)
        || active_total + deleted_total != all_total
    {
        return Ok(Some(FallbackReason::PredicateIgnored));
    }
    Ok(None)
}

/// Fetch the type-filtered set and paginate it locally
async fn fetch_full(api: &dyn TransactionApi, query: &ListQuery) -> Result<Page<Transaction>> {
    let response = api.list(&ListRequest::full(query)).await?;
    Ok(paginate(response.records, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryApi;
    use crate::domain::Filter;

    /// Requests spent checking the soft-delete predicate
    const CHECK_CALLS: u64 = 3;

    fn ids(page: &Page<Transaction>) -> Vec<String> {
        page.data.iter().map(|tx| tx.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_client_strategy_paginates_locally() {
        let api = InMemoryApi::demo().with_pagination(false);
        let paging = ServerPaging::new();
        let outcome = paging
            .fetch_page(&api, &ListQuery::new(Filter::All, 3, 10))
            .await
            .unwrap();

        assert!(outcome.fallback.is_none());
        assert_eq!(outcome.page.total, 22);
        assert_eq!(outcome.page.total_pages, 3);
        assert_eq!(outcome.page.data.len(), 2);
        assert_eq!(api.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_server_strategy_trusts_well_formed_pages() {
        let api = InMemoryApi::demo();
        let paging = ServerPaging::new();
        let outcome = paging
            .fetch_page(&api, &ListQuery::new(Filter::Deleted, 1, 10))
            .await
            .unwrap();

        assert!(outcome.fallback.is_none());
        assert_eq!(outcome.page.total, 2);
        assert_eq!(api.list_calls(), CHECK_CALLS + 1);

        // Checked once per service
        paging
            .fetch_page(&api, &ListQuery::new(Filter::Income, 1, 10))
            .await
            .unwrap();
        assert_eq!(api.list_calls(), CHECK_CALLS + 2);
        assert_eq!(paging.distrusted(), None);
    }

    #[tokio::test]
    async fn test_server_strategy_falls_back_on_ignored_predicate() {
        let api = InMemoryApi::demo().ignoring_predicates();
        let paging = ServerPaging::new();
        let outcome = paging
            .fetch_page(&api, &ListQuery::new(Filter::All, 1, 50))
            .await
            .unwrap();

        assert_eq!(outcome.fallback, Some(FallbackReason::PredicateIgnored));
        assert_eq!(outcome.page.total, 22);
        assert!(outcome.page.data.iter().all(|t| !t.is_deleted()));
        assert_eq!(api.list_calls(), CHECK_CALLS + 1);
    }

    #[tokio::test]
    async fn test_ignored_predicate_is_caught_on_pages_without_deleted_rows() {
        let honest = InMemoryApi::demo().with_pagination(false);
        let careless = InMemoryApi::demo().ignoring_predicates();
        let paging = ServerPaging::new();

        // Page 4 of 5 holds no deleted rows even when the predicate is ignored
        let query = ListQuery::new(Filter::All, 4, 5);
        let expected = ServerPaging::new().fetch_page(&honest, &query).await.unwrap().page;
        let outcome = paging.fetch_page(&careless, &query).await.unwrap();

        assert_eq!(outcome.fallback, Some(FallbackReason::PredicateIgnored));
        assert_eq!(outcome.page.total, 22);
        assert_eq!(ids(&outcome.page), ids(&expected));
    }

    #[tokio::test]
    async fn test_distrust_lasts_for_the_service() {
        let api = InMemoryApi::demo().ignoring_predicates();
        let paging = ServerPaging::new();

        paging
            .fetch_page(&api, &ListQuery::new(Filter::All, 1, 5))
            .await
            .unwrap();
        let calls = api.list_calls();

        let outcome = paging
            .fetch_page(&api, &ListQuery::new(Filter::Outcome, 2, 5))
            .await
            .unwrap();
        // Reported once, then every page is served locally with one request
        assert_eq!(outcome.fallback, None);
        assert_eq!(api.list_calls(), calls + 1);
        assert_eq!(paging.distrusted(), Some(FallbackReason::PredicateIgnored));
    }

    #[tokio::test]
    async fn test_both_strategies_agree() {
        let client = InMemoryApi::demo().with_pagination(false);
        let server = InMemoryApi::new(client.snapshot().unwrap());
        let (local, remote) = (ServerPaging::new(), ServerPaging::new());

        for filter in Filter::ALL {
            for page in 1..=4 {
                let query = ListQuery::new(filter, page, 7);
                let a = local.fetch_page(&client, &query).await.unwrap().page;
                let b = remote.fetch_page(&server, &query).await.unwrap().page;
                assert_eq!(a, b, "filter {} page {}", filter, page);
            }
        }
        assert_eq!(remote.distrusted(), None);
    }
}
