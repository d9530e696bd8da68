mod file_config;

pub use file_config::{FileConfig, PolicyConfig, RetryConfig, SyncConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub policy_url: Option<String>,
    pub policy_user: Option<String>,
    pub policy_password: Option<String>,
    pub policy_timeout_sec: u64,
    pub retry_interval_ms: u64,
    pub retry_limit: u32,
    pub sync_interval_secs: u64,
    pub worker_threads: usize,
    pub record_failed_fetches: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub policy_engine: PolicyEngineSettings,
    pub sync: SyncSettings,
}

/// Connection and retry settings for the policy engine API.
#[derive(Debug, Clone)]
pub struct PolicyEngineSettings {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout_sec: u64,
    /// `policy.retry.interval`, in milliseconds.
    pub retry_interval_ms: u64,
    /// `policy.retry.limit`, total attempts per request.
    pub retry_limit: u32,
}

impl Default for PolicyEngineSettings {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            timeout_sec: 30,
            retry_interval_ms: 0,
            retry_limit: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub interval_secs: u64,
    pub worker_threads: usize,
    /// Store an empty-bodied model when its definition could not be fetched.
    pub record_failed_fetches: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            worker_threads: 4,
            record_failed_fetches: true,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let policy_file = file.policy.unwrap_or_default();
        let retry_file = policy_file.retry.unwrap_or_default();
        let policy_engine = PolicyEngineSettings {
            url: policy_file
                .url
                .or_else(|| cli.policy_url.clone())
                .map(|url| url.trim_end_matches('/').to_string()),
            user: policy_file.user.or_else(|| cli.policy_user.clone()),
            password: policy_file.password.or_else(|| cli.policy_password.clone()),
            timeout_sec: policy_file.timeout_sec.unwrap_or(cli.policy_timeout_sec),
            retry_interval_ms: retry_file.interval.unwrap_or(cli.retry_interval_ms),
            retry_limit: retry_file.limit.unwrap_or(cli.retry_limit),
        };

        if policy_engine.retry_limit == 0 {
            bail!("policy.retry.limit must be at least 1");
        }
        if policy_engine.user.is_some() != policy_engine.password.is_some() {
            bail!("Both policy user and password must be provided together");
        }

        let sync_file = file.sync.unwrap_or_default();
        let sync = SyncSettings {
            interval_secs: sync_file.interval_secs.unwrap_or(cli.sync_interval_secs),
            worker_threads: sync_file.worker_threads.unwrap_or(cli.worker_threads),
            record_failed_fetches: sync_file
                .record_failed_fetches
                .unwrap_or(cli.record_failed_fetches),
        };

        if sync.worker_threads == 0 {
            bail!("sync.worker_threads must be at least 1");
        }
        if sync.interval_secs == 0 {
            bail!("sync.interval_secs must be at least 1");
        }

        Ok(Self {
            db_path,
            policy_engine,
            sync,
        })
    }

    /// The policy engine base URL, required by every command that talks to it.
    pub fn policy_url(&self) -> Result<&str> {
        match self.policy_engine.url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url),
            _ => bail!("policy url must be specified via --policy-url or in config file"),
        }
    }
}
