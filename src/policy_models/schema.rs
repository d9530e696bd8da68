//! Schema definition for the policy model catalog.

/// One step of the catalog schema history.
pub struct PolicyModelSchema {
    pub version: usize,
    pub up: &'static str,
}

pub const POLICY_MODEL_VERSIONED_SCHEMAS: &[PolicyModelSchema] = &[PolicyModelSchema {
    version: 1,
    up: r#"
            CREATE TABLE IF NOT EXISTS policy_models (
                policy_type TEXT NOT NULL,
                version TEXT NOT NULL,
                definition TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (policy_type, version)
            );

            CREATE INDEX IF NOT EXISTS idx_policy_models_created_at ON policy_models(created_at);
        "#,
}];
