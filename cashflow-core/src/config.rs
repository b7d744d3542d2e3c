//! Configuration management
//!
//! Settings live in `settings.json` inside the cashflow directory:
//! ```json
//! {
//!   "api": { "baseUrl": "http://localhost:3001", "listStrategy": "client", "timeoutSecs": 30 },
//!   "ui": { "pageSize": 10 },
//!   "cache": { "staleTimeSecs": 60, "gcTimeSecs": 1800 },
//!   "app": { "demoMode": false }
//! }
//! ```
//! Fields the CLI does not manage are preserved when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::adapters::json_server::{CASHFLOW_API_URL_ENV, DEFAULT_BASE_URL};
use crate::domain::query::DEFAULT_PAGE_SIZE;

/// Environment variable forcing demo mode on or off (for CI/testing)
pub const CASHFLOW_DEMO_MODE_ENV: &str = "CASHFLOW_DEMO_MODE";

const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STALE_TIME_SECS: u64 = 60;
const DEFAULT_GC_TIME_SECS: u64 = 30 * 60;

/// How listings are paginated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStrategy {
    /// Fetch the filtered set and paginate locally
    #[default]
    Client,
    /// Ask the backend for one page, falling back to `Client` when it misbehaves
    Server,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(default)]
    ui: UiSettings,
    #[serde(default)]
    cache: CacheSettings,
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default)]
    list_strategy: ListStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stale_time_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gc_time_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Cashflow configuration (resolved view of settings + environment)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub list_strategy: ListStrategy,
    pub timeout_secs: u64,
    pub page_size: u32,
    pub stale_time_secs: u64,
    /// How long an unused cached read is kept
    pub gc_time_secs: u64,
    pub demo_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            list_strategy: ListStrategy::Client,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            stale_time_secs: DEFAULT_STALE_TIME_SECS,
            gc_time_secs: DEFAULT_GC_TIME_SECS,
            demo_mode: false,
        }
    }
}

impl Config {
    /// Load config from the cashflow directory
    ///
    /// `CASHFLOW_API_URL` overrides the backend URL and `CASHFLOW_DEMO_MODE`
    /// overrides demo mode.
    pub fn load(cashflow_dir: &Path) -> Result<Self> {
        let raw = read_settings(cashflow_dir)?;
        let defaults = Self::default();

        let api_base_url = std::env::var(CASHFLOW_API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(raw.api.base_url)
            .unwrap_or(defaults.api_base_url);

        let demo_mode = match std::env::var(CASHFLOW_DEMO_MODE_ENV).ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        Ok(Self {
            api_base_url,
            list_strategy: raw.api.list_strategy,
            timeout_secs: raw.api.timeout_secs.unwrap_or(defaults.timeout_secs),
            page_size: raw
                .ui
                .page_size
                .filter(|&n| n > 0)
                .unwrap_or(defaults.page_size),
            stale_time_secs: raw.cache.stale_time_secs.unwrap_or(defaults.stale_time_secs),
            gc_time_secs: raw.cache.gc_time_secs.unwrap_or(defaults.gc_time_secs),
            demo_mode,
        })
    }

    /// Save config to the cashflow directory, preserving unmanaged fields
    pub fn save(&self, cashflow_dir: &Path) -> Result<()> {
        let mut settings = read_settings(cashflow_dir)?;
        let defaults = Self::default();

        settings.api.base_url =
            Some(self.api_base_url.clone()).filter(|url| *url != defaults.api_base_url);
        settings.api.list_strategy = self.list_strategy;
        settings.api.timeout_secs =
            Some(self.timeout_secs).filter(|&t| t != defaults.timeout_secs);
        settings.ui.page_size = Some(self.page_size).filter(|&n| n != defaults.page_size);
        settings.cache.stale_time_secs =
            Some(self.stale_time_secs).filter(|&t| t != defaults.stale_time_secs);
        settings.cache.gc_time_secs =
            Some(self.gc_time_secs).filter(|&t| t != defaults.gc_time_secs);
        settings.app.demo_mode = self.demo_mode;

        std::fs::create_dir_all(cashflow_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(cashflow_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

/// Read settings.json, treating a missing or unreadable file as empty
fn read_settings(cashflow_dir: &Path) -> Result<SettingsFile> {
    let settings_path = cashflow_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
