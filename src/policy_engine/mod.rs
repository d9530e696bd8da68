//! Communication with the policy engine.
//!
//! The gateway performs single HTTP calls; the fetcher wraps it with the
//! configured retry behavior.

mod fetcher;
mod gateway;
mod interrupt;

pub use fetcher::{FetchOutcome, PolicyFetcher, RetrySettings};
pub use gateway::{
    GatewayError, GatewayResponse, HttpPolicyEngineGateway, PolicyEngineGateway, PolicyRoute,
    RouteParams, POLICY_MODEL_NAME, POLICY_MODEL_VERSION,
};
pub use interrupt::{RetryInterrupter, WaitOutcome};

#[cfg(test)]
pub(crate) use fetcher::testing;
