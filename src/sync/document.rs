//! Parsing of the "list all policy types" document.
//!
//! The document is YAML with a top-level `policy_types` sequence of
//! single-entry mappings:
//!
//! ```yaml
//! policy_types:
//!   - onap.policies.Monitoring:
//!       version: 1.0.0
//!       description: a base policy type for all policies that govern monitoring
//!   - onap.policies.controlloop.Operational:
//!       version: 1.0.0
//! ```

use serde_yaml::{Mapping, Value};
use thiserror::Error;

const POLICY_TYPES_KEY: &str = "policy_types";
const VERSION_KEY: &str = "version";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is empty")]
    Empty,

    #[error("document is not valid YAML: {0}")]
    Syntax(#[from] serde_yaml::Error),

    #[error("document is not a key/value structure")]
    NotAMapping,

    #[error("document has no policy_types sequence")]
    MissingPolicyTypes,
}

/// One element of the `policy_types` sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTypeEntry {
    /// Position in the `policy_types` sequence.
    pub index: usize,
    pub name: String,
    pub metadata: Value,
}

impl PolicyTypeEntry {
    /// The `version` field, accepting numeric YAML scalars.
    pub fn version(&self) -> Option<String> {
        match self.metadata.get(VERSION_KEY)? {
            Value::String(version) => Some(version.clone()),
            Value::Number(version) => Some(version.to_string()),
            _ => None,
        }
    }
}

/// An element of `policy_types` that is not a non-empty mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEntry {
    pub index: usize,
    pub reason: String,
}

/// Parsed policy type catalog, valid for one synchronization pass.
#[derive(Debug, Clone, Default)]
pub struct PolicyTypeCatalogDocument {
    entries: Vec<PolicyTypeEntry>,
    malformed: Vec<MalformedEntry>,
}

impl PolicyTypeCatalogDocument {
    pub fn parse(raw: &str) -> Result<Self, DocumentError> {
        if raw.trim().is_empty() {
            return Err(DocumentError::Empty);
        }

        let root: Value = serde_yaml::from_str(raw)?;
        let root = match root {
            Value::Null => return Err(DocumentError::Empty),
            Value::Mapping(mapping) if mapping.is_empty() => return Err(DocumentError::Empty),
            Value::Mapping(mapping) => mapping,
            _ => return Err(DocumentError::NotAMapping),
        };

        let policy_types = match root.get(POLICY_TYPES_KEY) {
            Some(Value::Sequence(policy_types)) => policy_types,
            _ => return Err(DocumentError::MissingPolicyTypes),
        };

        let mut document = Self::default();
        for (index, element) in policy_types.iter().enumerate() {
            match first_entry(element) {
                Ok((name, metadata)) => document.entries.push(PolicyTypeEntry {
                    index,
                    name,
                    metadata,
                }),
                Err(reason) => document.malformed.push(MalformedEntry { index, reason }),
            }
        }
        Ok(document)
    }

    pub fn entries(&self) -> &[PolicyTypeEntry] {
        &self.entries
    }

    pub fn malformed(&self) -> &[MalformedEntry] {
        &self.malformed
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.malformed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn first_entry(element: &Value) -> Result<(String, Value), String> {
    let mapping: &Mapping = element
        .as_mapping()
        .ok_or_else(|| "policy type element is not a mapping".to_string())?;
    let (key, value) = mapping
        .iter()
        .next()
        .ok_or_else(|| "policy type element is empty".to_string())?;
    let name = key
        .as_str()
        .ok_or_else(|| "policy type name is not a string".to_string())?;
    Ok((name.to_string(), value.clone()))
}
