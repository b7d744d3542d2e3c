//! Core domain entities
//!
//! Pure data structures and rules: no I/O happens in this module.

pub mod currency;
pub mod query;
pub mod result;
pub mod route;
mod transaction;
pub mod validation;

pub use query::{Filter, ListQuery, Page, PageItem};
pub use route::{Modal, SearchParams};
pub use transaction::{NewTransactionBody, Transaction, TransactionInput, TransactionPatch, TransactionType};
