//! CLI command implementations

pub mod browse;
pub mod demo;
pub mod edit;
pub mod list;
pub mod logs;
pub mod new;
pub mod remove;
pub mod show;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cashflow_core::services::{EntryPoint, LogEvent, LoggingService};
use cashflow_core::CashflowContext;

/// Event log shared by a command and the services it drives
pub type Logger = Option<Arc<LoggingService>>;

/// Environment variable overriding the data directory
pub const CASHFLOW_DIR_ENV: &str = "CASHFLOW_DIR";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger(entry_point: EntryPoint) -> Logger {
    let cashflow_dir = get_cashflow_dir().ok()?;
    std::fs::create_dir_all(&cashflow_dir).ok()?;
    LoggingService::new(&cashflow_dir, entry_point, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Logger, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the cashflow directory from environment or default
pub fn get_cashflow_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CASHFLOW_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".cashflow"))
        .context("Could not find home directory; set CASHFLOW_DIR")
}

/// Get or create the cashflow context
pub fn get_context(logger: Logger) -> Result<CashflowContext> {
    let cashflow_dir = get_cashflow_dir()?;

    std::fs::create_dir_all(&cashflow_dir)
        .with_context(|| format!("Failed to create cashflow directory: {:?}", cashflow_dir))?;

    CashflowContext::new(&cashflow_dir, logger).context("Failed to initialize cashflow context")
}
