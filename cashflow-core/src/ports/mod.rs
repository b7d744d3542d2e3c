//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend on
//! these traits only, never on a concrete backend.

mod transaction_api;

pub use transaction_api::{ListRequest, ListResponse, PageRequest, TransactionApi};
