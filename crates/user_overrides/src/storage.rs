//! Durable storage for override records.
//!
//! Records live in two tables: one row per user with the nullable chat
//! attributes, and one row per (user, permission) pair. Every write that
//! touches both tables runs in a single transaction.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use crate::error::StorageError;
use crate::permission::Permission;
use crate::record::{ChatAttributes, ChatColor, OverrideRecord, UserId};

const CREATE_OVERRIDES_TABLE: &str = "CREATE TABLE IF NOT EXISTS user_overrides (
    user_id INTEGER PRIMARY KEY NOT NULL,
    prefix TEXT,
    suffix TEXT,
    color TEXT
)";

const CREATE_PERMISSIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS user_override_permissions (
    user_id INTEGER NOT NULL REFERENCES user_overrides(user_id) ON DELETE CASCADE,
    permission TEXT NOT NULL,
    negated INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL,
    PRIMARY KEY (user_id, permission)
)";

/// Storage backend for override records.
#[async_trait]
pub trait OverrideStorage: Send + Sync + std::fmt::Debug {
    /// Create the backing tables if they do not exist yet.
    async fn ensure_schema(&self) -> Result<(), StorageError>;

    /// Load every stored record.
    async fn load_all(&self) -> Result<Vec<OverrideRecord>, StorageError>;

    /// Insert a new record together with its permissions.
    async fn insert(&self, record: &OverrideRecord) -> Result<(), StorageError>;

    /// Overwrite a stored record, replacing its whole permission set.
    async fn replace(&self, record: &OverrideRecord) -> Result<(), StorageError>;

    /// Delete a record and its permissions. Returns whether a row existed.
    async fn delete(&self, user_id: UserId) -> Result<bool, StorageError>;
}

/// SQLite-backed [`OverrideStorage`].
#[derive(Debug, Clone)]
pub struct SqliteOverrideStorage {
    pool: SqlitePool,
}

impl SqliteOverrideStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url`, e.g. `sqlite://overrides.sqlite`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("🗄️ Connected to override database: {}", url);
        Ok(Self::new(pool))
    }

    /// A private in-memory database.
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool is
    /// pinned to one connection that never expires.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn write_permissions(
        tx: &mut Transaction<'_, Sqlite>,
        record: &OverrideRecord,
    ) -> Result<(), sqlx::Error> {
        for (position, permission) in record.permissions.iter().enumerate() {
            sqlx::query(
                "INSERT INTO user_override_permissions (user_id, permission, negated, position) VALUES (?, ?, ?, ?)",
            )
            .bind(record.user_id().get())
            .bind(permission.name())
            .bind(permission.is_negated())
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

fn color_column(record: &OverrideRecord) -> Option<String> {
    record.chat.color.map(|color| color.to_string())
}

#[async_trait]
impl OverrideStorage for SqliteOverrideStorage {
    #[instrument(skip(self))]
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_OVERRIDES_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_PERMISSIONS_TABLE).execute(&self.pool).await?;
        debug!("Override tables ensured");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_all(&self) -> Result<Vec<OverrideRecord>, StorageError> {
        // Both tables are read inside one transaction so a concurrent writer
        // cannot be observed half way.
        let mut tx = self.pool.begin().await?;

        let rows: Vec<(i64, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT user_id, prefix, suffix, color FROM user_overrides ORDER BY user_id")
                .fetch_all(&mut *tx)
                .await?;

        let permission_rows: Vec<(i64, String, bool)> = sqlx::query_as(
            "SELECT user_id, permission, negated FROM user_override_permissions ORDER BY user_id, position",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut records = BTreeMap::new();
        for (raw_id, prefix, suffix, color) in rows {
            let Some(user_id) = i32::try_from(raw_id).ok().and_then(|id| UserId::new(id).ok()) else {
                warn!("Skipping override row with invalid user id {}", raw_id);
                continue;
            };

            let color = match color.as_deref().map(ChatColor::from_str) {
                Some(Ok(color)) => Some(color),
                Some(Err(_)) => {
                    warn!("Ignoring malformed color stored for user {}", user_id);
                    None
                }
                None => None,
            };

            let chat = ChatAttributes { prefix, suffix, color };
            records.insert(raw_id, OverrideRecord::new(user_id, chat));
        }

        for (raw_id, name, negated) in permission_rows {
            let Some(record) = records.get_mut(&raw_id) else {
                warn!("Skipping permission '{}' for unknown user {}", name, raw_id);
                continue;
            };
            match Permission::from_parts(&name, negated) {
                Ok(permission) => record.permissions.add(permission),
                Err(e) => warn!("Skipping permission for user {}: {}", raw_id, e),
            }
        }

        debug!("Loaded {} override records", records.len());
        Ok(records.into_values().collect())
    }

    #[instrument(skip(self, record), fields(user_id = %record.user_id()))]
    async fn insert(&self, record: &OverrideRecord) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO user_overrides (user_id, prefix, suffix, color) VALUES (?, ?, ?, ?)")
            .bind(record.user_id().get())
            .bind(record.chat.prefix.as_deref())
            .bind(record.chat.suffix.as_deref())
            .bind(color_column(record))
            .execute(&mut *tx)
            .await?;

        Self::write_permissions(&mut tx, record).await?;

        tx.commit().await?;
        debug!("Inserted override record");
        Ok(())
    }

    #[instrument(skip(self, record), fields(user_id = %record.user_id()))]
    async fn replace(&self, record: &OverrideRecord) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO user_overrides (user_id, prefix, suffix, color) VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET prefix = excluded.prefix, suffix = excluded.suffix, color = excluded.color",
        )
        .bind(record.user_id().get())
        .bind(record.chat.prefix.as_deref())
        .bind(record.chat.suffix.as_deref())
        .bind(color_column(record))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM user_override_permissions WHERE user_id = ?")
            .bind(record.user_id().get())
            .execute(&mut *tx)
            .await?;

        Self::write_permissions(&mut tx, record).await?;

        tx.commit().await?;
        debug!("Replaced override record");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: UserId) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_override_permissions WHERE user_id = ?")
            .bind(user_id.get())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM user_overrides WHERE user_id = ?")
            .bind(user_id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission_set::PermissionSet;

    async fn storage() -> SqliteOverrideStorage {
        let storage = SqliteOverrideStorage::in_memory().await.unwrap();
        storage.ensure_schema().await.unwrap();
        storage
    }

    fn record(id: i32, prefix: Option<&str>, permissions: &str) -> OverrideRecord {
        OverrideRecord::with_permissions(
            UserId::new(id).unwrap(),
            ChatAttributes {
                prefix: prefix.map(str::to_string),
                suffix: None,
                color: Some(ChatColor::new(10, 20, 30)),
            },
            permissions.parse::<PermissionSet>().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_empty_table_loads_nothing() {
        let storage = storage().await;
        assert!(storage.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_schema_is_repeatable() {
        let storage = storage().await;
        storage.ensure_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_then_load() {
        let storage = storage().await;
        let original = record(5, Some("Boss"), "warp,!build");
        storage.insert(&original).await.unwrap();

        let loaded = storage.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], original);
        assert_eq!(loaded[0].permissions.to_string(), "warp,!build");
        assert_eq!(loaded[0].chat.color, Some(ChatColor::new(10, 20, 30)));
    }

    #[tokio::test]
    async fn test_insert_duplicate_fails_and_leaves_original() {
        let storage = storage().await;
        storage.insert(&record(5, Some("Boss"), "warp")).await.unwrap();

        let result = storage.insert(&record(5, Some("Other"), "heal")).await;
        assert!(matches!(result, Err(StorageError::Database(_))));

        let loaded = storage.load_all().await.unwrap();
        assert_eq!(loaded[0].chat.prefix.as_deref(), Some("Boss"));
        assert_eq!(loaded[0].permissions.to_string(), "warp");
    }

    #[tokio::test]
    async fn test_replace_rewrites_permissions() {
        let storage = storage().await;
        storage.insert(&record(7, Some("A"), "one,two,three")).await.unwrap();

        let mut updated = record(7, None, "!two");
        updated.chat.suffix = Some("!!".to_string());
        storage.replace(&updated).await.unwrap();

        let loaded = storage.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].chat.prefix, None);
        assert_eq!(loaded[0].chat.suffix.as_deref(), Some("!!"));
        assert_eq!(loaded[0].permissions.to_string(), "!two");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_permissions() {
        let storage = storage().await;
        storage.insert(&record(9, Some("X"), "a,b")).await.unwrap();

        assert!(storage.delete(UserId::new(9).unwrap()).await.unwrap());
        assert!(!storage.delete(UserId::new(9).unwrap()).await.unwrap());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_override_permissions")
            .fetch_one(storage.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_load_skips_malformed_values() {
        let storage = storage().await;
        sqlx::query("INSERT INTO user_overrides (user_id, prefix, suffix, color) VALUES (3, 'P', NULL, '999,0,0')")
            .execute(storage.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO user_override_permissions (user_id, permission, negated, position) VALUES (3, '', 0, 0), (3, 'warp', 1, 1)")
            .execute(storage.pool())
            .await
            .unwrap();

        let loaded = storage.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].chat.prefix.as_deref(), Some("P"));
        assert_eq!(loaded[0].chat.color, None);
        assert_eq!(loaded[0].permissions.to_string(), "!warp");
    }
}
