//! Query cache
//!
//! Keeps the last result of every read keyed by what was asked for. A key
//! holds one settled [`FetchState`] plus, while a request is running, the
//! shared in-flight cell every concurrent reader awaits, so a key never has
//! two requests at once.
//!
//! Entries age out after the freshness window; aged entries are still served
//! while they get revalidated. Invalidated entries are never served again:
//! the next read waits for a new request. A request already running when its
//! key is invalidated may finish, but its result is dropped.
//!
//! Entries nobody asked for within the gc window, and invalidated entries,
//! are evicted on the next read unless a request for them is still running.
//!
//! The map is guarded by a `std::sync::Mutex` that is never held across an
//! `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{watch, OnceCell};
use tokio::time::Instant;

use crate::domain::result::{Error, Result};

/// Freshness window used when none is configured
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60);

/// How long an unused entry is kept when no gc window is configured
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(30 * 60);

/// Observable state of a cached read
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    /// First request still running
    Pending,
    Success(T),
    Error(Error),
}

impl<T> FetchState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, FetchState::Pending)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            FetchState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            FetchState::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of looking a key up without fetching
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Within the freshness window
    Fresh(T),
    /// Older than the freshness window; usable while revalidating
    Stale(T),
    /// Nothing usable: absent, failed, still pending or invalidated
    Miss,
}

type Flight<V> = Arc<OnceCell<Result<V>>>;

struct Entry<V> {
    state: FetchState<V>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    in_flight: Option<Flight<V>>,
    last_used: Instant,
}

impl<V> Entry<V> {
    fn pending(flight: Flight<V>) -> Self {
        Self {
            state: FetchState::Pending,
            fetched_at: None,
            invalidated: false,
            in_flight: Some(flight),
            last_used: Instant::now(),
        }
    }

    fn evictable(&self, gc_time: Duration) -> bool {
        self.in_flight.is_none() && (self.invalidated || self.last_used.elapsed() >= gc_time)
    }
}

/// Cache of read results keyed by `K`
pub struct QueryCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    stale_time: Duration,
    gc_time: Duration,
    notifier: Arc<watch::Sender<u64>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache that bumps `notifier` on every change
    pub fn new(stale_time: Duration, notifier: Arc<watch::Sender<u64>>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stale_time,
            gc_time: DEFAULT_GC_TIME,
            notifier,
        }
    }

    /// Keep unused entries for `gc_time` instead of the default
    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    pub fn gc_time(&self) -> Duration {
        self.gc_time
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        // A poisoned map only means a panic elsewhere; the data is still whole.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        self.notifier.send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Receiver bumped whenever an entry changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }

    /// Drop entries that are invalidated or unused for longer than the gc
    /// window; returns how many
    pub fn evict_idle(&self) -> usize {
        let mut entries = self.lock();
        self.sweep(&mut entries)
    }

    fn sweep(&self, entries: &mut HashMap<K, Entry<V>>) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.evictable(self.gc_time));
        before - entries.len()
    }

    /// Classify what is cached for `key`
    pub fn lookup(&self, key: &K) -> Lookup<V> {
        let mut entries = self.lock();
        self.sweep(&mut entries);
        let Some(entry) = entries.get_mut(key) else {
            return Lookup::Miss;
        };
        entry.last_used = Instant::now();
        if entry.invalidated {
            return Lookup::Miss;
        }
        match (&entry.state, entry.fetched_at) {
            (FetchState::Success(value), Some(at)) if at.elapsed() < self.stale_time => {
                Lookup::Fresh(value.clone())
            }
            (FetchState::Success(value), _) => Lookup::Stale(value.clone()),
            _ => Lookup::Miss,
        }
    }

    /// Current state of `key`, `None` when it was never requested
    pub fn peek(&self, key: &K) -> Option<FetchState<V>> {
        self.lock().get(key).map(|entry| entry.state.clone())
    }

    /// Whether a request for `key` is running
    pub fn is_fetching(&self, key: &K) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|entry| entry.in_flight.is_some())
    }

    /// Run `fetcher` for `key` unless a request is already running, in which
    /// case its result is awaited instead. The settled result is stored.
    pub async fn fetch<F, Fut>(&self, key: K, fetcher: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let flight = {
            let mut entries = self.lock();
            self.sweep(&mut entries);
            match entries.get_mut(&key) {
                Some(entry) => {
                    entry.last_used = Instant::now();
                    entry
                        .in_flight
                        .get_or_insert_with(|| Arc::new(OnceCell::new()))
                        .clone()
                }
                None => {
                    let flight: Flight<V> = Arc::new(OnceCell::new());
                    entries.insert(key.clone(), Entry::pending(flight.clone()));
                    flight
                }
            }
        };

        let result = flight.get_or_init(fetcher).await.clone();
        self.settle(&key, &flight, &result);
        result
    }

    /// Store a finished request, unless the key was invalidated meanwhile
    fn settle(&self, key: &K, flight: &Flight<V>, result: &Result<V>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        let current = entry
            .in_flight
            .as_ref()
            .is_some_and(|running| Arc::ptr_eq(running, flight));
        if !current {
            return;
        }

        entry.in_flight = None;
        entry.invalidated = false;
        entry.fetched_at = Some(Instant::now());
        entry.last_used = Instant::now();
        entry.state = match result {
            Ok(value) => FetchState::Success(value.clone()),
            Err(e) => FetchState::Error(e.clone()),
        };
        drop(entries);
        self.notify();
    }

    /// Store a value obtained elsewhere
    pub fn insert(&self, key: K, value: V) {
        self.lock().insert(
            key,
            Entry {
                state: FetchState::Success(value),
                fetched_at: Some(Instant::now()),
                invalidated: false,
                in_flight: None,
                last_used: Instant::now(),
            },
        );
        self.notify();
    }

    /// Mark `key` as invalid
    pub fn invalidate(&self, key: &K) {
        self.invalidate_where(|k| k == key);
    }

    /// Mark every entry as invalid
    pub fn invalidate_all(&self) {
        self.invalidate_where(|_| true);
    }

    /// Mark every entry whose key matches as invalid; returns how many
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) -> usize {
        let mut entries = self.lock();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if predicate(key) {
                entry.invalidated = true;
                entry.in_flight = None;
                count += 1;
            }
        }
        drop(entries);
        if count > 0 {
            self.notify();
        }
        count
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.lock().clear();
        self.notify();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
