//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - json-server HTTP client for TransactionApi
//! - In-process (optionally file-backed) store for demo mode and tests
//! - Demo data generator

pub mod demo;
pub mod json_server;
pub mod memory;

#[cfg(test)]
pub mod json_server_mock;
