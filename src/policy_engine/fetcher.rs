//! Policy engine fetcher with bounded retry.
//!
//! A request is attempted up to `limit` times. Only status 200 counts as a
//! success; anything else (another status, a transport error, an unreadable
//! body) is followed by a wait of `interval` before the next attempt. There
//! is no wait after the last attempt.

use super::gateway::{
    GatewayError, PolicyEngineGateway, PolicyRoute, RouteParams, POLICY_MODEL_NAME,
    POLICY_MODEL_VERSION,
};
use super::interrupt::{RetryInterrupter, WaitOutcome};
use crate::config::PolicyEngineSettings;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry configuration owned by one fetcher. Every fetch makes at least one
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    interval: Duration,
    limit: u32,
}

impl RetrySettings {
    pub fn new(config: &PolicyEngineSettings) -> Self {
        Self::with(
            Duration::from_millis(config.retry_interval_ms),
            config.retry_limit,
        )
    }

    /// `limit` is the total number of attempts, raised to 1 when lower.
    pub fn with(interval: Duration, limit: u32) -> Self {
        Self {
            interval,
            limit: limit.max(1),
        }
    }

    /// Wait between two attempts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            interval: Duration::ZERO,
            limit: 1,
        }
    }
}

/// Result of one fetch, retries included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(String),
    /// Every attempt failed. `last_status` is `None` when the last attempt
    /// never got a response.
    Exhausted {
        attempts: u32,
        last_status: Option<u16>,
    },
    /// The last attempt returned 200 but its body could not be read.
    Malformed { attempts: u32, reason: String },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            FetchOutcome::Success(body) => Some(body),
            _ => None,
        }
    }

    /// The body, or an empty string when nothing was obtained.
    pub fn into_body(self) -> String {
        match self {
            FetchOutcome::Success(body) => body,
            _ => String::new(),
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Success(body) => write!(f, "success ({} bytes)", body.len()),
            FetchOutcome::Exhausted {
                attempts,
                last_status: Some(status),
            } => write!(
                f,
                "gave up after {} attempt(s), last status {}",
                attempts, status
            ),
            FetchOutcome::Exhausted {
                attempts,
                last_status: None,
            } => write!(
                f,
                "gave up after {} attempt(s), no response received",
                attempts
            ),
            FetchOutcome::Malformed { attempts, reason } => write!(
                f,
                "malformed response after {} attempt(s): {}",
                attempts, reason
            ),
        }
    }
}

enum AttemptFailure {
    Status(u16),
    Transport,
    Malformed(String),
}

/// Retrieves documents from the policy engine, retrying failed attempts.
pub struct PolicyFetcher {
    gateway: Arc<dyn PolicyEngineGateway>,
    retry: RetrySettings,
    interrupter: RetryInterrupter,
}

impl PolicyFetcher {
    pub fn new(gateway: Arc<dyn PolicyEngineGateway>, retry: RetrySettings) -> Self {
        Self {
            gateway,
            retry,
            interrupter: RetryInterrupter::new(),
        }
    }

    /// Share an interrupter so retry waits can be cut short from outside.
    pub fn with_interrupter(mut self, interrupter: RetryInterrupter) -> Self {
        self.interrupter = interrupter;
        self
    }

    pub fn interrupter(&self) -> &RetryInterrupter {
        &self.interrupter
    }

    pub fn retry_settings(&self) -> RetrySettings {
        self.retry
    }

    pub fn fetch(&self, route: PolicyRoute, params: &RouteParams) -> FetchOutcome {
        let mut last_failure = None;

        for attempt in 1..=self.retry.limit {
            let failure = match self.gateway.send(route, params) {
                Ok(response) if response.is_ok() => return FetchOutcome::Success(response.body),
                Ok(response) => AttemptFailure::Status(response.status),
                Err(GatewayError::MalformedBody(reason)) => AttemptFailure::Malformed(reason),
                Err(e) => {
                    debug!("Policy query {} attempt {} failed: {}", route, attempt, e);
                    AttemptFailure::Transport
                }
            };
            last_failure = Some(failure);

            if attempt < self.retry.limit {
                info!(
                    "Policy query {} failed (attempt {}/{}), waiting {}ms before retrying ...",
                    route,
                    attempt,
                    self.retry.limit,
                    self.retry.interval.as_millis()
                );
                if self.interrupter.wait(self.retry.interval) == WaitOutcome::Interrupted {
                    debug!("Retry wait for {} interrupted, continuing", route);
                }
            }
        }

        let attempts = self.retry.limit;
        let outcome = match last_failure {
            Some(AttemptFailure::Malformed(reason)) => FetchOutcome::Malformed { attempts, reason },
            Some(AttemptFailure::Status(status)) => FetchOutcome::Exhausted {
                attempts,
                last_status: Some(status),
            },
            Some(AttemptFailure::Transport) | None => FetchOutcome::Exhausted {
                attempts,
                last_status: None,
            },
        };
        warn!("Policy query {} {}", route, outcome);
        outcome
    }

    /// Download every policy type (and data type) known to the engine.
    pub fn download_all_policies(&self) -> FetchOutcome {
        self.fetch(PolicyRoute::ListAllPolicyTypes, &RouteParams::new())
    }

    /// Download the tosca model of one policy type version.
    pub fn download_one_policy(&self, policy_type: &str, policy_version: &str) -> FetchOutcome {
        let mut params = RouteParams::new();
        params.insert(POLICY_MODEL_NAME.to_string(), policy_type.to_string());
        params.insert(POLICY_MODEL_VERSION.to_string(), policy_version.to_string());
        self.fetch(PolicyRoute::GetOnePolicyModel, &params)
    }
}
