use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,

    // Feature configs
    pub policy: Option<PolicyConfig>,
    pub sync: Option<SyncConfig>,
}

/// The `[policy]` table. Together with `[policy.retry]` it carries the
/// `policy.retry.interval` and `policy.retry.limit` keys.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PolicyConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout_sec: Option<u64>,
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetryConfig {
    /// Milliseconds to wait between two attempts.
    pub interval: Option<u64>,
    /// Maximum number of attempts per request.
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_secs: Option<u64>,
    pub worker_threads: Option<usize>,
    pub record_failed_fetches: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
