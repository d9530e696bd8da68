//! Reconciliation of the local policy model catalog with the policy engine.
//!
//! One pass downloads the list of policy types, then, for each listed
//! (type, version), downloads its tosca model and stores it if absent.
//! Entries are processed in parallel on a bounded rayon pool; each entry
//! is fetched then stored on a single worker.

use super::document::{PolicyTypeCatalogDocument, PolicyTypeEntry};
use crate::config::SyncSettings;
use crate::policy_engine::{FetchOutcome, PolicyFetcher};
use crate::policy_models::{EnsureOutcome, ModelCatalog, PolicyModel, PolicyModelId};
use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// Model type and version referenced by a microservice blueprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroServiceModelRef {
    pub name: String,
    pub model_type: String,
    pub model_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncFailureReason {
    #[error("malformed policy type entry: {0}")]
    MalformedEntry(String),

    #[error("policy type has no version")]
    MissingVersion,

    #[error("model download failed: {0}")]
    Fetch(String),

    #[error("catalog store error: {0}")]
    Store(String),
}

/// A failure while processing one entry of the policy type list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub index: usize,
    pub policy_type: Option<String>,
    pub version: Option<String>,
    pub reason: SyncFailureReason,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub inserted: Vec<PolicyModelId>,
    pub already_present: Vec<PolicyModelId>,
    pub failures: Vec<SyncFailure>,
    /// Set when the pass stopped before processing entries.
    pub skipped_reason: Option<String>,
}

impl SyncReport {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.inserted.len() + self.already_present.len()
    }
}

#[derive(Default)]
struct EntrySync {
    stored: Option<(PolicyModelId, EnsureOutcome)>,
    failure: Option<SyncFailure>,
}

pub struct PolicySynchronizer {
    fetcher: PolicyFetcher,
    catalog: ModelCatalog,
    pool: ThreadPool,
    record_failed_fetches: bool,
}

impl PolicySynchronizer {
    pub fn new(fetcher: PolicyFetcher, catalog: ModelCatalog, settings: &SyncSettings) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(settings.worker_threads)
            .thread_name(|i| format!("policy-sync-{}", i))
            .build()
            .context("Failed to create policy sync worker pool")?;

        Ok(Self {
            fetcher,
            catalog,
            pool,
            record_failed_fetches: settings.record_failed_fetches,
        })
    }

    pub fn fetcher(&self) -> &PolicyFetcher {
        &self.fetcher
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Query the policy engine and build a model for `policy_type`/`policy_version`.
    ///
    /// The definition is empty when the download failed.
    pub fn create_policy_model_from_engine(
        &self,
        policy_type: &str,
        policy_version: &str,
    ) -> PolicyModel {
        PolicyModel::new(
            policy_type,
            self.fetcher
                .download_one_policy(policy_type, policy_version)
                .into_body(),
            policy_version,
        )
    }

    pub fn create_policy_model_for_microservice(
        &self,
        micro_service: &MicroServiceModelRef,
    ) -> PolicyModel {
        self.create_policy_model_from_engine(
            &micro_service.model_type,
            &micro_service.model_version,
        )
    }

    /// Run one full reconciliation pass.
    pub fn synchronize_all(&self) -> SyncReport {
        let start = Instant::now();

        let raw = match self.fetcher.download_all_policies() {
            FetchOutcome::Success(raw) => raw,
            outcome => {
                warn!("Policy type list could not be downloaded: {}", outcome);
                String::new()
            }
        };

        let document = match PolicyTypeCatalogDocument::parse(&raw) {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "Policy type list returned by policy engine could not be decoded: {}",
                    e
                );
                return SyncReport::skipped(e.to_string());
            }
        };

        let mut report = SyncReport::default();
        for malformed in document.malformed() {
            warn!(
                "Skipping policy type entry #{}: {}",
                malformed.index, malformed.reason
            );
            report.failures.push(SyncFailure {
                index: malformed.index,
                policy_type: None,
                version: None,
                reason: SyncFailureReason::MalformedEntry(malformed.reason.clone()),
            });
        }

        let results: Vec<EntrySync> = self.pool.install(|| {
            document
                .entries()
                .par_iter()
                .map(|entry| self.synchronize_entry(entry))
                .collect()
        });

        for result in results {
            match result.stored {
                Some((id, EnsureOutcome::Inserted)) => report.inserted.push(id),
                Some((id, EnsureOutcome::AlreadyPresent)) => report.already_present.push(id),
                None => {}
            }
            if let Some(failure) = result.failure {
                report.failures.push(failure);
            }
        }
        report.inserted.sort();
        report.already_present.sort();
        report.failures.sort_by_key(|f| f.index);

        info!(
            "Policy sync pass done in {:?}: {} inserted, {} already present, {} failed",
            start.elapsed(),
            report.inserted.len(),
            report.already_present.len(),
            report.failures.len()
        );
        report
    }

    fn synchronize_entry(&self, entry: &PolicyTypeEntry) -> EntrySync {
        let failure = |version: Option<String>, reason: SyncFailureReason| SyncFailure {
            index: entry.index,
            policy_type: Some(entry.name.clone()),
            version,
            reason,
        };

        let Some(version) = entry.version() else {
            warn!("Skipping policy type {}: no version", entry.name);
            return EntrySync {
                stored: None,
                failure: Some(failure(None, SyncFailureReason::MissingVersion)),
            };
        };

        self.fetch_and_store(entry.index, &entry.name, version)
    }

    /// Download one model and store it if absent, the way a pass handles a
    /// listed entry.
    pub fn synchronize_one(&self, policy_type: &str, version: &str) -> SyncReport {
        let result = self.fetch_and_store(0, policy_type, version.to_string());
        let mut report = SyncReport::default();
        match result.stored {
            Some((id, EnsureOutcome::Inserted)) => report.inserted.push(id),
            Some((id, EnsureOutcome::AlreadyPresent)) => report.already_present.push(id),
            None => {}
        }
        report.failures.extend(result.failure);
        report
    }

    fn fetch_and_store(&self, index: usize, policy_type: &str, version: String) -> EntrySync {
        let failure = |version: String, reason: SyncFailureReason| SyncFailure {
            index,
            policy_type: Some(policy_type.to_string()),
            version: Some(version),
            reason,
        };

        let mut result = EntrySync::default();
        let definition = match self.fetcher.download_one_policy(policy_type, &version) {
            FetchOutcome::Success(definition) => definition,
            outcome => {
                result.failure = Some(failure(
                    version.clone(),
                    SyncFailureReason::Fetch(outcome.to_string()),
                ));
                if !self.record_failed_fetches {
                    warn!(
                        "Policy model {}:{} not recorded: {}",
                        policy_type, version, outcome
                    );
                    return result;
                }
                warn!(
                    "Recording policy model {}:{} with an empty definition: {}",
                    policy_type, version, outcome
                );
                String::new()
            }
        };

        let model = PolicyModel::new(policy_type, definition, version.clone());
        match self.catalog.ensure_exists(&model) {
            Ok(outcome) => result.stored = Some((model.id(), outcome)),
            Err(e) => {
                warn!("Failed to store policy model {}: {:#}", model.id(), e);
                result.failure = Some(failure(
                    version,
                    SyncFailureReason::Store(format!("{:#}", e)),
                ));
            }
        }
        result
    }
}
