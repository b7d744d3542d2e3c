//! Transaction backend port
//!
//! Defines the interface for talking to whatever stores transactions: the
//! json-server REST API in production, an in-process store for demo mode and
//! tests.

use async_trait::async_trait;

use crate::domain::query::{DeletedScope, ListQuery};
use crate::domain::result::Result;
use crate::domain::{Transaction, TransactionInput, TransactionPatch, TransactionType};

/// Server-side pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

/// A listing request sent to the backend
///
/// Results are always requested newest first (`_sort=-createdAt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    /// Equality filter on `type`
    pub kind: Option<TransactionType>,
    /// Soft-delete predicate; `None` asks for every record
    pub scope: Option<DeletedScope>,
    /// Page to fetch; `None` asks for the full set
    pub page: Option<PageRequest>,
}

impl ListRequest {
    /// Full filtered set, to be paginated by the caller
    pub fn full(query: &ListQuery) -> Self {
        Self {
            kind: query.filter.type_filter(),
            scope: None,
            page: None,
        }
    }

    /// A single page with every predicate delegated to the backend
    pub fn paged(query: &ListQuery) -> Self {
        Self {
            kind: query.filter.type_filter(),
            scope: Some(query.filter.deleted_scope()),
            page: Some(PageRequest {
                page: query.page,
                limit: query.limit,
            }),
        }
    }
}

/// What the backend returned for a listing
#[derive(Debug, Clone, Default)]
pub struct ListResponse {
    pub records: Vec<Transaction>,
    /// Total matching records, when the backend reported one
    pub total: Option<u64>,
}

/// Transaction backend trait
///
/// Implementations translate these calls into requests against a concrete
/// backend. Errors use the core taxonomy: `Network` for transport failures,
/// `NotFound` for a missing id, `Server` for any other non-2xx status.
#[async_trait]
pub trait TransactionApi: Send + Sync {
    /// Backend name (e.g., "json-server", "demo")
    fn name(&self) -> &str;

    /// Whether this backend honours pagination and soft-delete predicates
    fn can_paginate(&self) -> bool;

    /// `GET /transactions`
    async fn list(&self, request: &ListRequest) -> Result<ListResponse>;

    /// `GET /transactions/{id}`
    async fn get(&self, id: &str) -> Result<Transaction>;

    /// `POST /transactions`
    async fn create(&self, input: &TransactionInput) -> Result<Transaction>;

    /// `PATCH /transactions/{id}`
    async fn patch(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction>;

    /// `DELETE /transactions/{id}`
    async fn delete(&self, id: &str) -> Result<()>;
}
