//! Concurrent access tests
//!
//! Many tasks hitting one transaction service at once, on a multi-threaded
//! runtime: reads of the same page must share a request, duplicate mutations
//! must be rejected while one is in flight, and the event log must not lose
//! entries written from several threads.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::Barrier;

use cashflow_core::adapters::memory::InMemoryApi;
use cashflow_core::services::{EntryPoint, LogEvent, LoggingService, TransactionService};
use cashflow_core::{Error, Filter, ListQuery, TransactionInput, TransactionType};

/// Number of concurrent tasks for stress tests
const TASK_COUNT: usize = 8;

/// Service over a locally paginated demo backend that answers after `latency`
fn slow_service(latency: Duration) -> (Arc<InMemoryApi>, Arc<TransactionService>) {
    let api = Arc::new(
        InMemoryApi::demo()
            .with_pagination(false)
            .with_latency(latency),
    );
    let service = Arc::new(TransactionService::new(api.clone()));
    (api, service)
}

/// Test: every task asks for the same page at the same moment
///
/// Expected: one backend request, identical pages for everyone
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_page_from_many_tasks_is_one_request() {
    let (api, service) = slow_service(Duration::from_millis(50));
    let barrier = Arc::new(Barrier::new(TASK_COUNT));

    let mut handles = Vec::new();
    for _ in 0..TASK_COUNT {
        let service = service.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.list(&ListQuery::default()).await
        }));
    }

    let mut pages = Vec::new();
    for handle in handles {
        pages.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(api.list_calls(), 1);
    assert!(pages.windows(2).all(|w| w[0] == w[1]));
}

/// Test: every task reads a different page of a backend that paginates
/// itself but ignores the soft-delete predicate
///
/// Expected: the backend is sampled once, every page is counted after the
/// soft-delete filter
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pages_agree_on_unreliable_backend() {
    let api = Arc::new(
        InMemoryApi::demo()
            .ignoring_predicates()
            .with_latency(Duration::from_millis(20)),
    );
    let service = Arc::new(TransactionService::new(api.clone()));
    let barrier = Arc::new(Barrier::new(TASK_COUNT));

    let mut handles = Vec::new();
    for page in 1..=TASK_COUNT as u32 {
        let service = service.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.list(&ListQuery::new(Filter::All, page, 3)).await
        }));
    }

    for handle in handles {
        let page = handle.await.unwrap().unwrap();
        assert_eq!(page.total, 22);
        assert!(page.data.iter().all(|tx| !tx.is_deleted()));
    }
    assert_eq!(api.list_calls(), 3 + TASK_COUNT as u64);
}

/// Test: tasks read different pages concurrently
///
/// Expected: one request per distinct key, each answer for its own key
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_pages_do_not_mix() {
    let (api, service) = slow_service(Duration::from_millis(20));
    let queries: Vec<ListQuery> = Filter::ALL
        .iter()
        .flat_map(|&f| (1..=2).map(move |page| ListQuery::new(f, page, 5)))
        .collect();

    let mut handles = Vec::new();
    for query in queries.iter().copied() {
        for _ in 0..2 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { (query, service.list(&query).await) }));
        }
    }

    for handle in handles {
        let (query, result) = handle.await.unwrap();
        let page = result.unwrap();
        assert_eq!(page.page, query.page);
        assert_eq!(page.limit, query.limit);
        assert!(page.data.iter().all(|tx| query.filter.matches(tx)));
    }

    assert_eq!(api.list_calls(), queries.len() as u64);
}

/// Test: the same soft delete is fired from every task at once
///
/// Expected: exactly one reaches the backend, the rest are rejected as busy
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_mutations_are_rejected() {
    let (api, service) = slow_service(Duration::from_millis(100));
    let barrier = Arc::new(Barrier::new(TASK_COUNT));
    let busy = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..TASK_COUNT {
        let service = service.clone();
        let barrier = barrier.clone();
        let busy = busy.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let result = service.soft_delete("demo_004").await;
            if matches!(result, Err(Error::Busy(_))) {
                busy.fetch_add(1, Ordering::SeqCst);
            }
            result.is_ok()
        }));
    }

    let mut saved = 0;
    for handle in handles {
        if handle.await.unwrap() {
            saved += 1;
        }
    }

    assert_eq!(saved, 1);
    assert_eq!(busy.load(Ordering::SeqCst), TASK_COUNT - 1);
    assert_eq!(api.mutation_calls(), 1);

    // The guard is released once the mutation settled
    service.restore("demo_004").await.unwrap();
}

/// Test: creates in flight while pages are being read
///
/// Expected: reads started after the create settled see the new record
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_after_mutation_see_new_data() {
    let (_, service) = slow_service(Duration::from_millis(10));
    let income = ListQuery::new(Filter::Income, 1, 50);
    assert_eq!(service.list(&income).await.unwrap().total, 7);

    let reader = {
        let service = service.clone();
        tokio::spawn(async move { service.list(&ListQuery::default()).await })
    };
    service
        .create(&TransactionInput::new(TransactionType::Income, 4200))
        .await
        .unwrap();
    reader.await.unwrap().unwrap();

    assert_eq!(service.list(&income).await.unwrap().total, 8);
}

/// Test: several threads write to the event log at once
///
/// Expected: every entry is stored
#[test]
fn test_concurrent_log_writes() {
    let temp_dir = TempDir::new().unwrap();
    let logger =
        Arc::new(LoggingService::new(temp_dir.path(), EntryPoint::Cli, "test").unwrap());

    let mut handles = vec![];
    for thread_id in 0..TASK_COUNT {
        let logger = Arc::clone(&logger);
        handles.push(thread::spawn(move || {
            for i in 0..5 {
                logger
                    .log(LogEvent::new("stress").with_command(format!("t{}_i{}", thread_id, i)))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(logger.count().unwrap(), (TASK_COUNT * 5) as u64);
}
