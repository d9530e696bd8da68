//! Background job implementations.

pub mod policy_sync;

pub use policy_sync::PolicySyncJob;
