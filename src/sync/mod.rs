//! Policy model synchronization with the policy engine.

mod document;
mod synchronizer;

pub use document::{DocumentError, MalformedEntry, PolicyTypeCatalogDocument, PolicyTypeEntry};
pub use synchronizer::{
    MicroServiceModelRef, PolicySynchronizer, SyncFailure, SyncFailureReason, SyncReport,
};
