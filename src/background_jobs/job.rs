use super::context::JobContext;
use std::fmt;
use std::time::Duration;

/// When the scheduler starts a job: on each listed hook, and every
/// `interval` counted from the start of the previous run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSchedule {
    pub interval: Duration,
    pub hooks: Vec<HookEvent>,
}

impl JobSchedule {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            hooks: Vec::new(),
        }
    }

    pub fn on(mut self, event: HookEvent) -> Self {
        if !self.hooks.contains(&event) {
            self.hooks.push(event);
        }
        self
    }

    pub fn is_triggered_by(&self, event: HookEvent) -> bool {
        self.hooks.contains(&event)
    }
}

/// Lifecycle events a job can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    OnStartup,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookEvent::OnStartup => f.write_str("OnStartup"),
        }
    }
}

#[derive(Debug)]
pub enum JobError {
    ExecutionFailed(String),
    Cancelled,
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::ExecutionFailed(msg) => write!(f, "job failed: {}", msg),
            JobError::Cancelled => f.write_str("job cancelled"),
        }
    }
}

impl std::error::Error for JobError {}

/// A unit of periodic or event-driven work.
///
/// `execute` runs on the blocking thread pool, so it may block on I/O.
pub trait BackgroundJob: Send + Sync {
    /// Stable key, used in logs and to avoid overlapping runs.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn schedule(&self) -> JobSchedule;

    /// Run once. The context is cancelled when the scheduler shuts down,
    /// long jobs should poll `ctx.is_cancelled()` and return
    /// `JobError::Cancelled` when it is set.
    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
