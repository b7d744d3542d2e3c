//! Cashflow Core - business logic for the personal finance tracker
//!
//! This crate follows a hexagonal architecture:
//!
//! - **domain**: transactions, currency codec, filters, pagination, URL state
//! - **ports**: the `TransactionApi` trait the services talk to
//! - **adapters**: json-server HTTP client, in-process demo backend
//! - **services**: query cache, transaction service, URL-state controller,
//!   form controller, home page view model, event log

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use adapters::json_server::JsonServerClient;
use adapters::memory::InMemoryApi;
use config::Config;
use ports::TransactionApi;
use services::{HomePage, LoggingService, TransactionService};

pub use domain::result::{Error, OperationResult};
pub use domain::{
    Filter, ListQuery, Modal, Page, PageItem, SearchParams, Transaction, TransactionInput,
    TransactionPatch, TransactionType,
};

/// File the demo backend persists to
pub const DEMO_DB_FILE: &str = "demo.json";

/// Main context for Cashflow operations
///
/// Holds the resolved configuration and the transaction service wired to
/// either the json-server backend or, in demo mode, the local demo store.
pub struct CashflowContext {
    pub config: Config,
    pub cashflow_dir: PathBuf,
    pub transactions: Arc<TransactionService>,
    logger: Option<Arc<LoggingService>>,
}

impl CashflowContext {
    /// Create a context from the settings in `cashflow_dir`
    pub fn new(cashflow_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        let config = Config::load(cashflow_dir)?;
        Self::with_config(cashflow_dir, config, logger)
    }

    /// Create a context with an explicit configuration
    pub fn with_config(
        cashflow_dir: &Path,
        config: Config,
        logger: Option<Arc<LoggingService>>,
    ) -> Result<Self> {
        let api: Arc<dyn TransactionApi> = if config.demo_mode {
            Arc::new(InMemoryApi::open(&cashflow_dir.join(DEMO_DB_FILE))?)
        } else {
            Arc::new(JsonServerClient::from_config(&config)?)
        };

        let mut service = TransactionService::with_cache_times(
            api,
            Duration::from_secs(config.stale_time_secs),
            Duration::from_secs(config.gc_time_secs),
        );
        if let Some(logger) = &logger {
            service = service.with_logger(logger.clone());
        }

        Ok(Self {
            config,
            cashflow_dir: cashflow_dir.to_path_buf(),
            transactions: Arc::new(service),
            logger,
        })
    }

    /// Home page for `url`, before its first load
    pub fn home(&self, url: &str) -> HomePage {
        let home = HomePage::open(self.transactions.clone(), url);
        match &self.logger {
            Some(logger) => home.with_logger(logger.clone()),
            None => home,
        }
    }

    /// Name of the backend in use
    pub fn backend(&self) -> &str {
        self.transactions.backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_demo_context_lists_seeded_data() {
        let dir = tempdir().unwrap();
        let config = Config {
            demo_mode: true,
            ..Config::default()
        };

        let ctx = CashflowContext::with_config(dir.path(), config, None).unwrap();
        assert_eq!(ctx.backend(), "demo");
        assert!(dir.path().join(DEMO_DB_FILE).exists());

        let page = ctx.transactions.list(&ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 22);
    }

    #[test]
    fn test_json_server_context() {
        let dir = tempdir().unwrap();
        let config = Config {
            api_base_url: "http://127.0.0.1:9/".to_string(),
            ..Config::default()
        };

        let ctx = CashflowContext::with_config(dir.path(), config, None).unwrap();
        assert_eq!(ctx.backend(), "json-server");
    }
}
