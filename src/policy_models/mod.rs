//! Local catalog of policy models.
//!
//! Models are keyed by (policy type, version), inserted once and never
//! updated or deleted.

mod catalog;
mod models;
mod schema;
mod store;

pub use catalog::{EnsureOutcome, ModelCatalog};
pub use models::{PolicyModel, PolicyModelId, StoredPolicyModel};
pub use schema::POLICY_MODEL_VERSIONED_SCHEMAS;
pub use store::{PolicyModelStore, SqlitePolicyModelStore};

#[cfg(test)]
pub(crate) use catalog::testing;
