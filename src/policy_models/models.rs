use chrono::{DateTime, Utc};
use std::fmt;

/// Catalog key of a policy model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyModelId {
    pub policy_type: String,
    pub version: String,
}

impl PolicyModelId {
    pub fn new(policy_type: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            policy_type: policy_type.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PolicyModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.policy_type, self.version)
    }
}

/// A versioned policy type definition (tosca) retrieved from the policy engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyModel {
    pub policy_type: String,
    pub version: String,
    /// Raw tosca document, possibly empty when the download failed.
    pub definition: String,
}

impl PolicyModel {
    pub fn new(
        policy_type: impl Into<String>,
        definition: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            policy_type: policy_type.into(),
            version: version.into(),
            definition: definition.into(),
        }
    }

    pub fn id(&self) -> PolicyModelId {
        PolicyModelId::new(self.policy_type.clone(), self.version.clone())
    }
}

/// A policy model as persisted in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPolicyModel {
    pub model: PolicyModel,
    pub created_at: DateTime<Utc>,
}

impl StoredPolicyModel {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "policy_type": self.model.policy_type,
            "version": self.model.version,
            "definition": self.model.definition,
            "created_at": self.created_at.to_rfc3339(),
        })
    }
}
