//! Test fixtures
//!
//! On-disk policy model databases and synchronizers wired to a fake engine.

use clamp_policy_sync::config::{PolicyEngineSettings, SyncSettings};
use clamp_policy_sync::policy_engine::{HttpPolicyEngineGateway, PolicyFetcher, RetrySettings};
use clamp_policy_sync::policy_models::{ModelCatalog, PolicyModelStore, SqlitePolicyModelStore};
use clamp_policy_sync::sync::PolicySynchronizer;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A policy model database in its own temporary directory.
pub struct TestDatabase {
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            path: temp_dir.path().join("policy_models.db"),
            _temp_dir: temp_dir,
        }
    }

    /// Open a fresh store on the database file.
    pub fn open(&self) -> Arc<dyn PolicyModelStore> {
        Arc::new(SqlitePolicyModelStore::new(&self.path).expect("Failed to open policy model store"))
    }
}

/// Build a synchronizer talking to `base_url` over HTTP and storing into `store`.
pub fn build_synchronizer(
    base_url: &str,
    store: Arc<dyn PolicyModelStore>,
    engine: PolicyEngineSettings,
    sync: SyncSettings,
) -> PolicySynchronizer {
    let gateway =
        HttpPolicyEngineGateway::new(base_url, &engine).expect("Failed to create gateway");
    let fetcher = PolicyFetcher::new(Arc::new(gateway), RetrySettings::new(&engine));
    PolicySynchronizer::new(fetcher, ModelCatalog::new(store), &sync)
        .expect("Failed to create synchronizer")
}
