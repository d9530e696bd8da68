use super::models::PolicyModel;
use super::store::PolicyModelStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Inserted,
    AlreadyPresent,
}

/// Insert-if-absent access to the policy model store.
#[derive(Clone)]
pub struct ModelCatalog {
    store: Arc<dyn PolicyModelStore>,
}

impl ModelCatalog {
    pub fn new(store: Arc<dyn PolicyModelStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PolicyModelStore> {
        &self.store
    }

    /// Make sure a model with the same (type, version) key is stored.
    ///
    /// An existing model is left untouched, even if `model` carries a
    /// different definition.
    pub fn ensure_exists(&self, model: &PolicyModel) -> Result<EnsureOutcome> {
        let id = model.id();
        if self.store.exists_by_id(&id)? {
            debug!("Policy model {} already in catalog", id);
            return Ok(EnsureOutcome::AlreadyPresent);
        }

        // A concurrent insert of the same key may land between the two calls
        if self.store.save(model)? {
            info!("Policy model {} added to catalog", id);
            Ok(EnsureOutcome::Inserted)
        } else {
            debug!("Policy model {} inserted concurrently", id);
            Ok(EnsureOutcome::AlreadyPresent)
        }
    }
}
