//! Periodic policy model synchronization.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule},
};
use crate::sync::PolicySynchronizer;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Background job running one reconciliation pass at startup, then every
/// `interval`.
pub struct PolicySyncJob {
    synchronizer: Arc<PolicySynchronizer>,
    interval: Duration,
}

impl PolicySyncJob {
    pub fn new(synchronizer: Arc<PolicySynchronizer>, interval: Duration) -> Self {
        Self {
            synchronizer,
            interval,
        }
    }
}

impl BackgroundJob for PolicySyncJob {
    fn id(&self) -> &'static str {
        "policy_sync"
    }

    fn name(&self) -> &'static str {
        "Policy Sync"
    }

    fn description(&self) -> &'static str {
        "Download policy models from the policy engine and store the missing ones"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::every(self.interval).on(HookEvent::OnStartup)
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let report = self.synchronizer.synchronize_all();

        if let Some(reason) = &report.skipped_reason {
            info!("Policy sync had nothing to do: {}", reason);
            return Ok(());
        }
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        if !report.is_clean() {
            return Err(JobError::ExecutionFailed(format!(
                "policy sync finished with {} failure(s)",
                report.failures.len()
            )));
        }
        Ok(())
    }
}
