//! Background job scheduling and execution system.
//!
//! Runs periodic and startup-triggered tasks, such as keeping the policy
//! model catalog in step with the policy engine.

mod context;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use job::{BackgroundJob, HookEvent, JobError, JobSchedule};
pub use scheduler::JobScheduler;
