use super::context::JobContext;
use super::job::{BackgroundJob, HookEvent, JobError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Upper bound on how long the scheduler sleeps between checks.
const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// How long shutdown waits for a running job before leaving it behind.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Manages background job scheduling and execution.
pub struct JobScheduler {
    jobs: HashMap<String, Arc<dyn BackgroundJob>>,

    /// Next due time of each interval job.
    next_runs: HashMap<String, Instant>,

    /// Jobs currently executing; shared with the spawned tasks.
    running_jobs: Arc<RwLock<HashSet<String>>>,

    /// Currently running jobs with their task handles.
    running_handles: HashMap<String, JoinHandle<()>>,

    /// Cancellation tokens for each running job.
    job_cancel_tokens: HashMap<String, CancellationToken>,

    /// Signalled by each job task when it finishes.
    job_finished: Arc<Notify>,

    /// Token to signal scheduler shutdown.
    shutdown_token: CancellationToken,
}

impl JobScheduler {
    pub fn new(shutdown_token: CancellationToken) -> Self {
        Self {
            jobs: HashMap::new(),
            next_runs: HashMap::new(),
            running_jobs: Arc::new(RwLock::new(HashSet::new())),
            running_handles: HashMap::new(),
            job_cancel_tokens: HashMap::new(),
            job_finished: Arc::new(Notify::new()),
            shutdown_token,
        }
    }

    /// Register a job with the scheduler.
    ///
    /// A job is due immediately unless a startup hook also triggers it, in
    /// which case the hook run counts as the first one.
    pub fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        let job_id = job.id().to_string();
        info!("Registering job: {} - {}", job_id, job.description());

        let schedule = job.schedule();
        let first_run = if schedule.is_triggered_by(HookEvent::OnStartup) {
            Instant::now() + schedule.interval
        } else {
            Instant::now()
        };
        self.next_runs.insert(job_id.clone(), first_run);
        self.jobs.insert(job_id, job);
    }

    /// Get the number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Main scheduler loop. Returns once the shutdown token is cancelled.
    pub async fn run(&mut self) {
        info!(
            "Starting job scheduler with {} registered jobs",
            self.job_count()
        );

        self.trigger_jobs_for_hook(HookEvent::OnStartup).await;

        loop {
            self.cleanup_completed_jobs().await;

            let sleep_duration = self.time_until_next_scheduled_job().await;
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs().await;
                }
                _ = self.job_finished.notified() => {}
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    async fn time_until_next_scheduled_job(&self) -> Duration {
        let mut min_duration = DEFAULT_CHECK_INTERVAL;
        let now = Instant::now();

        let running = self.running_jobs.read().await;
        for (job_id, next_run) in &self.next_runs {
            if running.contains(job_id) {
                continue;
            }
            if *next_run <= now {
                return Duration::ZERO;
            }
            min_duration = min_duration.min(*next_run - now);
        }

        min_duration
    }

    async fn run_due_jobs(&mut self) {
        let now = Instant::now();
        let due: Vec<String> = {
            let running = self.running_jobs.read().await;
            self.next_runs
                .iter()
                .filter(|(job_id, next_run)| **next_run <= now && !running.contains(*job_id))
                .map(|(job_id, _)| job_id.clone())
                .collect()
        };

        for job_id in due {
            self.spawn_job(&job_id, "schedule").await;
        }
    }

    async fn trigger_jobs_for_hook(&mut self, event: HookEvent) {
        let mut jobs_to_trigger = Vec::new();

        {
            let running = self.running_jobs.read().await;
            for (job_id, job) in &self.jobs {
                if running.contains(job_id) {
                    debug!("Skipping hook trigger for already running job: {}", job_id);
                    continue;
                }
                if job.schedule().is_triggered_by(event) {
                    jobs_to_trigger.push(job_id.clone());
                }
            }
        }

        for job_id in jobs_to_trigger {
            let trigger = format!("hook:{}", event);
            self.spawn_job(&job_id, &trigger).await;
        }
    }

    /// Spawn a job execution task.
    async fn spawn_job(&mut self, job_id: &str, triggered_by: &str) {
        let Some(job) = self.jobs.get(job_id).map(Arc::clone) else {
            error!("Attempted to spawn unknown job: {}", job_id);
            return;
        };

        info!("Starting job: {} (triggered_by: {})", job_id, triggered_by);

        self.running_jobs.write().await.insert(job_id.to_string());

        // Next due time counts from the start of this run
        self.next_runs
            .insert(job_id.to_string(), Instant::now() + job.schedule().interval);

        let cancel_token = self.shutdown_token.child_token();
        self.job_cancel_tokens
            .insert(job_id.to_string(), cancel_token.clone());
        let ctx = JobContext::new(cancel_token);

        let job_id_owned = job_id.to_string();
        let running_jobs = Arc::clone(&self.running_jobs);
        let job_finished = Arc::clone(&self.job_finished);

        // Jobs are synchronous, run them on the blocking pool
        let handle = tokio::spawn(async move {
            let start_time = std::time::Instant::now();
            let result = tokio::task::spawn_blocking(move || job.execute(&ctx)).await;
            let elapsed = start_time.elapsed();

            match result {
                Ok(Ok(())) => {
                    info!(
                        "Job {} completed successfully in {:?}",
                        job_id_owned, elapsed
                    );
                }
                Ok(Err(JobError::Cancelled)) => {
                    info!("Job {} was cancelled after {:?}", job_id_owned, elapsed);
                }
                Ok(Err(e)) => {
                    error!("Job {} failed after {:?}: {}", job_id_owned, elapsed, e);
                }
                Err(e) => {
                    error!("Job {} panicked after {:?}: {}", job_id_owned, elapsed, e);
                }
            }

            running_jobs.write().await.remove(&job_id_owned);
            job_finished.notify_one();
        });

        self.running_handles.insert(job_id.to_string(), handle);
    }

    async fn cleanup_completed_jobs(&mut self) {
        let completed: Vec<String> = self
            .running_handles
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(job_id, _)| job_id.clone())
            .collect();

        for job_id in completed {
            if let Some(handle) = self.running_handles.remove(&job_id) {
                let _ = handle.await;
            }
            self.job_cancel_tokens.remove(&job_id);
        }
    }

    /// Gracefully shut down the scheduler.
    async fn shutdown(&mut self) {
        info!("Shutting down scheduler...");

        for (job_id, token) in &self.job_cancel_tokens {
            debug!("Cancelling job: {}", job_id);
            token.cancel();
        }

        for (job_id, handle) in self.running_handles.drain() {
            if !handle.is_finished() {
                info!("Waiting for job {} to complete...", job_id);
            }
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, handle).await;
        }

        self.job_cancel_tokens.clear();
        info!("Scheduler shutdown complete");
    }
}
