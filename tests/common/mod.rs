//! Common test infrastructure
//!
//! Provides a fake policy engine served over real HTTP, the documents it
//! serves, and helpers wiring the synchronizer to an on-disk database.
//! Tests should only import from this module, not from internal submodules.

mod constants;
mod fixtures;
mod policy_engine;

pub use constants::*;
pub use fixtures::{build_synchronizer, TestDatabase};
pub use policy_engine::{FakePolicyEngine, RecordedRequest};
