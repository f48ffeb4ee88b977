//! `SQLite` implementation of [`FlagStore`].

use std::future::Future;

use sqlx::SqlitePool;

use fieldnode_app::ports::FlagStore;
use fieldnode_domain::error::NodeError;
use fieldnode_domain::provisioning::DEFAULT_NAMESPACE;

use crate::error::StorageError;

/// Value written for `true`. Any other stored value reads back as `false`,
/// so a zeroed or torn row never looks like a completed registration.
pub const TRUE_MARKER: i64 = 0xABCD;

const SELECT: &str = "SELECT value FROM flags WHERE namespace = ? AND key = ?";
const UPSERT: &str = "INSERT INTO flags (namespace, key, value) VALUES (?, ?, ?) \
     ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value";

/// `SQLite`-backed flag store scoped to one namespace.
pub struct SqliteFlagStore {
    pool: SqlitePool,
    namespace: String,
}

impl SqliteFlagStore {
    /// Create a store using the default device namespace.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_namespace(pool, DEFAULT_NAMESPACE)
    }

    #[must_use]
    pub fn with_namespace(pool: SqlitePool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl FlagStore for SqliteFlagStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<bool>, NodeError>> + Send {
        let pool = self.pool.clone();
        let namespace = self.namespace.clone();
        let key = key.to_string();
        async move {
            let row: Option<(i64,)> = sqlx::query_as(SELECT)
                .bind(&namespace)
                .bind(&key)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;
            Ok(row.map(|(value,)| value == TRUE_MARKER))
        }
    }

    fn set(&self, key: &str, value: bool) -> impl Future<Output = Result<(), NodeError>> + Send {
        let pool = self.pool.clone();
        let namespace = self.namespace.clone();
        let key = key.to_string();
        async move {
            let stored = if value { TRUE_MARKER } else { 0 };
            sqlx::query(UPSERT)
                .bind(&namespace)
                .bind(&key)
                .bind(stored)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;
            tracing::debug!(%namespace, %key, value, "flag persisted");
            Ok(())
        }
    }
}
