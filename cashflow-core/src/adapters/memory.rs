//! In-process transaction backend
//!
//! Implements the same contract as json-server over a `Vec<Transaction>`.
//! When opened with a path the collection is persisted as a json-server
//! style `db.json` (`{ "transactions": [...] }`) after every mutation, which
//! is what demo mode uses. Tests use the knobs below to simulate latency,
//! transient failures and backends that ignore pagination parameters.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::demo::generate_demo_transactions;
use crate::domain::query::sort_newest_first;
use crate::domain::result::{Error, Result};
use crate::domain::{Transaction, TransactionInput, TransactionPatch};
use crate::ports::{ListRequest, ListResponse, TransactionApi};

/// File layout shared with json-server
#[derive(Debug, Default, Serialize, Deserialize)]
struct DbFile {
    #[serde(default)]
    transactions: Vec<Transaction>,
}

/// In-memory (optionally file-backed) backend
pub struct InMemoryApi {
    records: Mutex<Vec<Transaction>>,
    path: Option<PathBuf>,
    paginate: bool,
    honour_predicates: bool,
    latency: Option<Duration>,
    pending_failures: AtomicU32,
    list_calls: AtomicU64,
    get_calls: AtomicU64,
    mutation_calls: AtomicU64,
}

impl InMemoryApi {
    /// Backend holding the given records
    pub fn new(records: Vec<Transaction>) -> Self {
        Self {
            records: Mutex::new(records),
            path: None,
            paginate: true,
            honour_predicates: true,
            latency: None,
            pending_failures: AtomicU32::new(0),
            list_calls: AtomicU64::new(0),
            get_calls: AtomicU64::new(0),
            mutation_calls: AtomicU64::new(0),
        }
    }

    /// Backend seeded with demo data
    pub fn demo() -> Self {
        Self::new(generate_demo_transactions())
    }

    /// Open a file-backed store, seeding it with demo data on first use
    pub fn open(path: &Path) -> Result<Self> {
        let records = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<DbFile>(&content)?.transactions
        } else {
            let seeded = generate_demo_transactions();
            write_db(path, &seeded)?;
            seeded
        };

        let mut api = Self::new(records);
        api.path = Some(path.to_path_buf());
        Ok(api)
    }

    /// Toggle server-side pagination support
    pub fn with_pagination(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    /// Claim pagination support but ignore the soft-delete predicate
    pub fn ignoring_predicates(mut self) -> Self {
        self.honour_predicates = false;
        self
    }

    /// Delay every request by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `count` requests with a network error
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> u64 {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    /// Copy of every stored record
    pub fn snapshot(&self) -> Result<Vec<Transaction>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Transaction>>> {
        self.records
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))
    }

    async fn simulate_network(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failed = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::network("simulated connection reset"));
        }
        Ok(())
    }

    fn persist(&self, records: &[Transaction]) -> Result<()> {
        match &self.path {
            Some(path) => write_db(path, records),
            None => Ok(()),
        }
    }
}

fn write_db(path: &Path, records: &[Transaction]) -> Result<()> {
    let db = DbFile {
        transactions: records.to_vec(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&db)?)?;
    Ok(())
}

#[async_trait]
impl TransactionApi for InMemoryApi {
    fn name(&self) -> &str {
        "demo"
    }

    fn can_paginate(&self) -> bool {
        self.paginate
    }

    async fn list(&self, request: &ListRequest) -> Result<ListResponse> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;

        let mut records: Vec<Transaction> = self
            .lock()?
            .iter()
            .filter(|tx| request.kind.map_or(true, |k| tx.kind == k))
            .cloned()
            .collect();

        if self.paginate && self.honour_predicates {
            if let Some(scope) = request.scope {
                records.retain(|tx| scope.matches(tx));
            }
        }
        sort_newest_first(&mut records);

        match request.page.filter(|_| self.paginate) {
            Some(page) => {
                let total = records.len() as u64;
                let offset = (page.page.saturating_sub(1) as usize) * page.limit as usize;
                let data = records
                    .into_iter()
                    .skip(offset)
                    .take(page.limit as usize)
                    .collect();
                Ok(ListResponse {
                    records: data,
                    total: Some(total),
                })
            }
            None => Ok(ListResponse {
                records,
                total: None,
            }),
        }
    }

    async fn get(&self, id: &str) -> Result<Transaction> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;

        self.lock()?
            .iter()
            .find(|tx| tx.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("transaction '{}'", id)))
    }

    async fn create(&self, input: &TransactionInput) -> Result<Transaction> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;

        let id = Uuid::new_v4().simple().to_string()[..12].to_string();
        let tx = Transaction::new(id, input.kind, input.amount);

        let mut records = self.lock()?;
        records.push(tx.clone());
        self.persist(&records)?;
        Ok(tx)
    }

    async fn patch(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;

        let mut records = self.lock()?;
        let tx = records
            .iter_mut()
            .find(|tx| tx.id == id)
            .ok_or_else(|| Error::not_found(format!("transaction '{}'", id)))?;

        tx.apply_patch(patch);
        if patch.updated_at.is_none() {
            tx.updated_at = Utc::now();
        }
        let updated = tx.clone();

        self.persist(&records)?;
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;

        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|tx| tx.id != id);
        if records.len() == before {
            return Err(Error::not_found(format!("transaction '{}'", id)));
        }
        self.persist(&records)?;
        Ok(())
    }
}
