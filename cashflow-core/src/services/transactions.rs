//! Transaction service - cached reads and guarded mutations
//!
//! Reads go through the query cache: lists keyed by (filter, page, limit),
//! single records keyed by id. Each read is retried once on a network or
//! server error. Mutations are sent straight to the backend and, when they
//! succeed, invalidate every list and the record they touched. A failed
//! mutation leaves the cache alone.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use super::listing::ServerPaging;
use super::logging::{events, LogEvent, LoggingService};
use super::query_cache::{FetchState, Lookup, QueryCache, DEFAULT_GC_TIME, DEFAULT_STALE_TIME};
use crate::domain::result::{Error, Result};
use crate::domain::{ListQuery, Page, Transaction, TransactionInput, TransactionPatch};
use crate::ports::TransactionApi;

/// Kinds of mutation, each guarded separately per target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    SoftDelete,
    Restore,
    HardDelete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::SoftDelete => "soft_delete",
            MutationKind::Restore => "restore",
            MutationKind::HardDelete => "hard_delete",
        }
    }
}

/// Set of mutations currently running
#[derive(Default)]
struct MutationGuard {
    active: Mutex<HashSet<(MutationKind, String)>>,
}

impl MutationGuard {
    fn acquire(&self, kind: MutationKind, target: &str) -> Result<MutationTicket<'_>> {
        let key = (kind, target.to_string());
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.clone()) {
            return Err(Error::Busy(format!(
                "{} already in progress{}",
                kind.as_str(),
                if target.is_empty() {
                    String::new()
                } else {
                    format!(" for '{}'", target)
                }
            )));
        }
        Ok(MutationTicket { guard: self, key })
    }
}

/// Releases its slot in the guard when dropped
struct MutationTicket<'a> {
    guard: &'a MutationGuard,
    key: (MutationKind, String),
}

impl Drop for MutationTicket<'_> {
    fn drop(&mut self) {
        let mut active = self.guard.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.key);
    }
}

/// Run `op`, running it once more if the first failure is retryable
pub async fn retry_once<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match op().await {
        Err(e) if e.is_retryable() => op().await,
        other => other,
    }
}

/// Service for reading and changing transactions
pub struct TransactionService {
    api: Arc<dyn TransactionApi>,
    lists: Arc<QueryCache<ListQuery, Page<Transaction>>>,
    details: Arc<QueryCache<String, Transaction>>,
    paging: Arc<ServerPaging>,
    mutations: MutationGuard,
    logger: Option<Arc<LoggingService>>,
}

impl TransactionService {
    /// Create a service with the default freshness window
    pub fn new(api: Arc<dyn TransactionApi>) -> Self {
        Self::with_stale_time(api, DEFAULT_STALE_TIME)
    }

    pub fn with_stale_time(api: Arc<dyn TransactionApi>, stale_time: Duration) -> Self {
        Self::with_cache_times(api, stale_time, DEFAULT_GC_TIME)
    }

    /// Create a service with explicit freshness and gc windows
    pub fn with_cache_times(
        api: Arc<dyn TransactionApi>,
        stale_time: Duration,
        gc_time: Duration,
    ) -> Self {
        let notifier = Arc::new(watch::channel(0u64).0);
        Self {
            api,
            lists: Arc::new(QueryCache::new(stale_time, notifier.clone()).with_gc_time(gc_time)),
            details: Arc::new(QueryCache::new(stale_time, notifier).with_gc_time(gc_time)),
            paging: Arc::new(ServerPaging::new()),
            mutations: MutationGuard::default(),
            logger: None,
        }
    }

    /// Record fallbacks and failures in the event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Name of the backend in use
    pub fn backend(&self) -> &str {
        self.api.name()
    }

    /// One page of transactions
    pub async fn list(&self, query: &ListQuery) -> Result<Page<Transaction>> {
        match self.lists.lookup(query) {
            Lookup::Fresh(page) => Ok(page),
            Lookup::Stale(page) => {
                self.revalidate_list(*query);
                Ok(page)
            }
            Lookup::Miss => self.lists.fetch(*query, || self.list_fetcher(*query)).await,
        }
    }

    /// Fetch a page, bypassing any cached value
    pub async fn refresh(&self, query: &ListQuery) -> Result<Page<Transaction>> {
        self.lists.invalidate(query);
        self.lists.fetch(*query, || self.list_fetcher(*query)).await
    }

    /// A single transaction
    pub async fn get(&self, id: &str) -> Result<Transaction> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::validation("transaction id cannot be empty"));
        }

        let key = id.to_string();
        match self.details.lookup(&key) {
            Lookup::Fresh(tx) => Ok(tx),
            Lookup::Stale(tx) => {
                self.revalidate_detail(key);
                Ok(tx)
            }
            Lookup::Miss => {
                let fetcher = self.detail_fetcher(key.clone());
                self.details.fetch(key, || fetcher).await
            }
        }
    }

    fn list_fetcher(
        &self,
        query: ListQuery,
    ) -> impl Future<Output = Result<Page<Transaction>>> + Send + 'static {
        let api = self.api.clone();
        let paging = self.paging.clone();
        let logger = self.logger.clone();
        async move {
            let outcome = retry_once(|| paging.fetch_page(api.as_ref(), &query)).await;
            match outcome {
                Ok(outcome) => {
                    if let Some(reason) = outcome.fallback {
                        log(
                            &logger,
                            LogEvent::new(events::LIST_FALLBACK)
                                .with_backend(api.name())
                                .with_error_details(reason.to_string()),
                        );
                    }
                    Ok(outcome.page)
                }
                Err(e) => {
                    log(
                        &logger,
                        LogEvent::new(events::FETCH_FAILED)
                            .with_backend(api.name())
                            .with_error(e.to_string()),
                    );
                    Err(e)
                }
            }
        }
    }

    fn detail_fetcher(
        &self,
        id: String,
    ) -> impl Future<Output = Result<Transaction>> + Send + 'static {
        let api = self.api.clone();
        let logger = self.logger.clone();
        async move {
            let result = retry_once(|| api.get(&id)).await;
            if let Err(e) = &result {
                log(
                    &logger,
                    LogEvent::new(events::FETCH_FAILED)
                        .with_backend(api.name())
                        .with_error(e.to_string()),
                );
            }
            result
        }
    }

    fn revalidate_list(&self, query: ListQuery) {
        if self.lists.is_fetching(&query) {
            return;
        }
        let cache = self.lists.clone();
        let fetcher = self.list_fetcher(query);
        tokio::spawn(async move {
            let _ = cache.fetch(query, || fetcher).await;
        });
    }

    fn revalidate_detail(&self, id: String) {
        if self.details.is_fetching(&id) {
            return;
        }
        let cache = self.details.clone();
        let fetcher = self.detail_fetcher(id.clone());
        tokio::spawn(async move {
            let _ = cache.fetch(id, || fetcher).await;
        });
    }

    /// Create a transaction
    pub async fn create(&self, input: &TransactionInput) -> Result<Transaction> {
        input.validate()?;
        let _ticket = self.mutations.acquire(MutationKind::Create, "")?;

        let result = self.api.create(input).await;
        self.settle(MutationKind::Create, None, result)
    }

    /// Replace the type and amount of a transaction
    pub async fn update(&self, id: &str, input: &TransactionInput) -> Result<Transaction> {
        input.validate()?;
        self.patch(
            MutationKind::Update,
            id,
            TransactionPatch::edit(Some(input.kind), Some(input.amount)),
        )
        .await
    }

    /// Mark a transaction as deleted
    pub async fn soft_delete(&self, id: &str) -> Result<Transaction> {
        self.patch(MutationKind::SoftDelete, id, TransactionPatch::soft_delete())
            .await
    }

    /// Bring a soft-deleted transaction back
    pub async fn restore(&self, id: &str) -> Result<Transaction> {
        self.patch(MutationKind::Restore, id, TransactionPatch::restore())
            .await
    }

    /// Remove a transaction for good
    pub async fn hard_delete(&self, id: &str) -> Result<()> {
        let id = require_id(id)?;
        let _ticket = self.mutations.acquire(MutationKind::HardDelete, id)?;

        let result = self.api.delete(id).await;
        self.settle(MutationKind::HardDelete, Some(id), result)
    }

    async fn patch(
        &self,
        kind: MutationKind,
        id: &str,
        patch: TransactionPatch,
    ) -> Result<Transaction> {
        let id = require_id(id)?;
        patch.validate()?;
        let _ticket = self.mutations.acquire(kind, id)?;

        let result = self.api.patch(id, &patch).await;
        self.settle(kind, Some(id), result)
    }

    /// Invalidate on success, log on failure
    fn settle<T>(&self, kind: MutationKind, id: Option<&str>, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                self.lists.invalidate_all();
                if let Some(id) = id {
                    self.details.invalidate(&id.to_string());
                }
            }
            Err(e) => log(
                &self.logger,
                LogEvent::new(events::MUTATION_FAILED)
                    .with_backend(self.api.name())
                    .with_command(kind.as_str())
                    .with_error(e.to_string()),
            ),
        }
        result
    }

    /// Cached state of a list, `None` when it was never requested
    pub fn peek_list(&self, query: &ListQuery) -> Option<FetchState<Page<Transaction>>> {
        self.lists.peek(query)
    }

    /// Cached state of a record, `None` when it was never requested
    pub fn peek_detail(&self, id: &str) -> Option<FetchState<Transaction>> {
        self.details.peek(&id.to_string())
    }

    /// Receiver bumped whenever a cached list or record changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.lists.subscribe()
    }

    /// Force every cached read to be refetched
    pub fn invalidate_all(&self) {
        self.lists.invalidate_all();
        self.details.invalidate_all();
    }
}

fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::validation("transaction id cannot be empty"));
    }
    Ok(id)
}

/// Best-effort: logging must never fail an operation
fn log(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(logger) = logger {
        let _ = logger.log(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryApi;
    use crate::domain::{Filter, TransactionType};

    fn service(api: &Arc<InMemoryApi>) -> TransactionService {
        TransactionService::new(api.clone())
    }

    /// Demo backend paginated locally: one list request per page read
    fn client_api() -> Arc<InMemoryApi> {
        Arc::new(InMemoryApi::demo().with_pagination(false))
    }

    #[tokio::test]
    async fn test_fresh_hits_do_not_refetch() {
        let api = client_api();
        let service = service(&api);
        let query = ListQuery::default();

        service.list(&query).await.unwrap();
        service.list(&query).await.unwrap();
        assert_eq!(api.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_once_on_network_error() {
        let api = client_api();
        let service = service(&api);

        api.fail_next(1);
        let page = service.list(&ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 22);
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_two_failures_surface_an_error_state() {
        let api = Arc::new(InMemoryApi::demo());
        let service = service(&api);
        let query = ListQuery::default();

        api.fail_next(2);
        assert!(matches!(service.list(&query).await, Err(Error::Network(_))));
        assert!(matches!(service.peek_list(&query), Some(FetchState::Error(_))));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let api = Arc::new(InMemoryApi::demo());
        let service = service(&api);

        assert!(matches!(service.get("missing").await, Err(Error::NotFound(_))));
        assert_eq!(api.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_id_makes_no_request() {
        let api = Arc::new(InMemoryApi::demo());
        let service = service(&api);

        assert!(matches!(service.get("  ").await, Err(Error::Validation(_))));
        assert!(matches!(service.soft_delete("").await, Err(Error::Validation(_))));
        assert_eq!(api.get_calls(), 0);
        assert_eq!(api.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_request() {
        let api = Arc::new(InMemoryApi::demo());
        let service = service(&api);

        let result = service
            .create(&TransactionInput::new(TransactionType::Income, 0))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(api.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn test_mutation_invalidates_lists() {
        let api = client_api();
        let service = service(&api);
        let query = ListQuery::new(Filter::Income, 1, 10);

        let before = service.list(&query).await.unwrap();
        service
            .create(&TransactionInput::new(TransactionType::Income, 5000))
            .await
            .unwrap();
        let after = service.list(&query).await.unwrap();

        assert_eq!(after.total, before.total + 1);
        assert_eq!(after.data[0].amount, 5000);
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache() {
        let api = client_api();
        let service = service(&api);
        let query = ListQuery::default();

        service.list(&query).await.unwrap();
        api.fail_next(1);
        assert!(service.soft_delete("demo_001").await.is_err());

        service.list(&query).await.unwrap();
        assert_eq!(api.list_calls(), 1);
        assert!(!api.snapshot().unwrap()[0].is_deleted());
    }

    #[tokio::test]
    async fn test_concurrent_same_mutation_is_busy() {
        let api = Arc::new(InMemoryApi::demo().with_latency(Duration::from_millis(30)));
        let service = service(&api);

        let (a, b) = tokio::join!(service.soft_delete("demo_001"), service.soft_delete("demo_001"));
        let busy = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(Error::Busy(_))))
            .count();
        assert_eq!(busy, 1);
        assert!(a.is_ok() || b.is_ok());
        assert_eq!(api.mutation_calls(), 1);
    }

    #[tokio::test]
    async fn test_different_targets_do_not_block() {
        let api = Arc::new(InMemoryApi::demo().with_latency(Duration::from_millis(10)));
        let service = service(&api);

        let (a, b) = tokio::join!(service.soft_delete("demo_001"), service.soft_delete("demo_002"));
        assert!(a.is_ok() && b.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_hit_revalidates_in_background() {
        let api = client_api();
        let service = TransactionService::with_stale_time(api.clone(), Duration::from_secs(60));
        let query = ListQuery::default();

        service.list(&query).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        let stale = service.list(&query).await.unwrap();
        assert_eq!(stale.total, 22);

        let mut rx = service.subscribe();
        rx.borrow_and_update();
        rx.changed().await.unwrap();
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_backend_pagination_is_checked_once() {
        let api = Arc::new(InMemoryApi::demo().with_latency(Duration::from_millis(10)));
        let service = service(&api);

        let q1 = ListQuery::new(Filter::All, 1, 5);
        let q2 = ListQuery::new(Filter::All, 2, 5);
        let (a, b) = tokio::join!(service.list(&q1), service.list(&q2));
        assert_eq!(a.unwrap().total, 22);
        assert_eq!(b.unwrap().total, 22);
        // Three sampling requests shared by both reads, then one per page
        assert_eq!(api.list_calls(), 5);
    }

    #[tokio::test]
    async fn test_unreliable_backend_pagination_is_abandoned() {
        let api = Arc::new(InMemoryApi::demo().ignoring_predicates());
        let service = service(&api);

        for page in 1..=5 {
            let listed = service.list(&ListQuery::new(Filter::All, page, 5)).await.unwrap();
            assert_eq!(listed.total, 22);
            assert!(listed.data.iter().all(|tx| !tx.is_deleted()));
        }
        assert_eq!(api.list_calls(), 3 + 5);
    }

    #[tokio::test]
    async fn test_retry_once_helper() {
        let mut attempts = 0;
        let result: Result<u32> = retry_once(|| {
            attempts += 1;
            let attempt = attempts;
            async move {
                if attempt == 1 {
                    Err(Error::server(503, "busy"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
    }
}
