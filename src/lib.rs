//! CLAMP policy model synchronizer.
//!
//! Keeps a local catalog of policy models (tosca definitions) in step with
//! the policy engine: every policy type the engine lists is downloaded and
//! stored once.

pub mod background_jobs;
pub mod config;
pub mod loop_graph;
pub mod policy_engine;
pub mod policy_models;
pub mod sync;

pub use policy_engine::{HttpPolicyEngineGateway, PolicyFetcher};
pub use policy_models::{ModelCatalog, SqlitePolicyModelStore};
pub use sync::{PolicySynchronizer, SyncReport};
