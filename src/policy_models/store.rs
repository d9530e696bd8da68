//! Persistent storage for policy models.

use super::models::{PolicyModel, PolicyModelId, StoredPolicyModel};
use super::schema::POLICY_MODEL_VERSIONED_SCHEMAS;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Trait for policy model storage backends.
pub trait PolicyModelStore: Send + Sync {
    fn exists_by_id(&self, id: &PolicyModelId) -> Result<bool>;

    /// Insert `model` in a transaction of its own.
    ///
    /// Returns `false` when a model with the same key is already stored; the
    /// stored model is never overwritten.
    fn save(&self, model: &PolicyModel) -> Result<bool>;

    fn get(&self, id: &PolicyModelId) -> Result<Option<StoredPolicyModel>>;

    /// All models, ordered by policy type then version.
    fn list(&self) -> Result<Vec<StoredPolicyModel>>;

    fn count(&self) -> Result<usize>;
}

/// SQLite-backed [`PolicyModelStore`].
#[derive(Clone)]
pub struct SqlitePolicyModelStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePolicyModelStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let mut conn = Connection::open(path)
            .with_context(|| format!("Failed to open policy model database at {:?}", path))?;

        let db_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        Self::migrate_if_needed(&mut conn, db_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &mut Connection, db_version: i64) -> Result<()> {
        let latest = POLICY_MODEL_VERSIONED_SCHEMAS
            .last()
            .map(|s| s.version as i64)
            .unwrap_or(0);

        if db_version > latest {
            bail!(
                "Policy model database version {} is newer than supported version {}",
                db_version,
                latest
            );
        }
        if db_version == latest {
            return Ok(());
        }

        info!(
            "Migrating policy model database from version {} to {}",
            db_version, latest
        );
        let tx = conn.transaction()?;
        for schema in POLICY_MODEL_VERSIONED_SCHEMAS
            .iter()
            .filter(|s| s.version as i64 > db_version)
        {
            tx.execute_batch(schema.up).with_context(|| {
                format!("Failed to apply policy model schema version {}", schema.version)
            })?;
        }
        tx.execute_batch(&format!("PRAGMA user_version = {}", latest))?;
        tx.commit()?;
        Ok(())
    }

    fn row_to_stored_model(row: &rusqlite::Row) -> rusqlite::Result<StoredPolicyModel> {
        let created_at_str: String = row.get("created_at")?;
        Ok(StoredPolicyModel {
            model: PolicyModel {
                policy_type: row.get("policy_type")?,
                version: row.get("version")?,
                definition: row.get("definition")?,
            },
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

impl PolicyModelStore for SqlitePolicyModelStore {
    fn exists_by_id(&self, id: &PolicyModelId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM policy_models WHERE policy_type = ?1 AND version = ?2)",
            params![id.policy_type, id.version],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn save(&self, model: &PolicyModel) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO policy_models (policy_type, version, definition, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                model.policy_type,
                model.version,
                model.definition,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()
            .with_context(|| format!("Failed to commit policy model {}", model.id()))?;
        Ok(inserted > 0)
    }

    fn get(&self, id: &PolicyModelId) -> Result<Option<StoredPolicyModel>> {
        let conn = self.conn.lock().unwrap();
        let model = conn
            .query_row(
                "SELECT policy_type, version, definition, created_at
                 FROM policy_models
                 WHERE policy_type = ?1 AND version = ?2",
                params![id.policy_type, id.version],
                Self::row_to_stored_model,
            )
            .optional()?;
        Ok(model)
    }

    fn list(&self) -> Result<Vec<StoredPolicyModel>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT policy_type, version, definition, created_at
             FROM policy_models
             ORDER BY policy_type ASC, version ASC",
        )?;
        let models = stmt
            .query_map([], Self::row_to_stored_model)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(models)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM policy_models", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}
