//! Lookup of the host's user accounts.
//!
//! Accounts are owned by the host; overrides only refer to them by [`UserId`].
//! A name query first looks for exact (case-insensitive) matches and falls
//! back to names starting with the query. Case folding is ASCII only, the
//! same as SQLite's `lower()`, so every directory matches names alike.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use std::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::{OverrideError, OverrideResult, StorageError};
use crate::record::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Every account matching `name`: exact matches if any, else prefix matches.
    async fn find_by_name(&self, name: &str) -> OverrideResult<Vec<UserAccount>>;

    /// Accounts whose name equals `name` ignoring case. Never falls back to prefixes.
    async fn find_exact(&self, name: &str) -> OverrideResult<Vec<UserAccount>>;

    async fn find_by_id(&self, id: UserId) -> OverrideResult<Option<UserAccount>>;
}

/// Resolve `name` to exactly one account.
pub async fn resolve_single(directory: &dyn UserDirectory, name: &str) -> OverrideResult<UserAccount> {
    single_match(directory.find_by_name(name).await?, name)
}

/// Like [`resolve_single`], but only an exact name counts.
pub async fn resolve_exact(directory: &dyn UserDirectory, name: &str) -> OverrideResult<UserAccount> {
    single_match(directory.find_exact(name).await?, name)
}

fn single_match(mut matches: Vec<UserAccount>, name: &str) -> OverrideResult<UserAccount> {
    match matches.len() {
        0 => Err(OverrideError::not_found(format!(
            "Could not find a user under the name '{name}'"
        ))),
        1 => Ok(matches.remove(0)),
        _ => Err(OverrideError::AmbiguousMatch(
            matches.into_iter().map(|account| account.name).collect(),
        )),
    }
}

fn exact_matches<'a, I>(accounts: I, name: &str) -> Vec<UserAccount>
where
    I: IntoIterator<Item = &'a UserAccount>,
{
    accounts
        .into_iter()
        .filter(|account| account.name.eq_ignore_ascii_case(name))
        .cloned()
        .collect()
}

fn select_matches<'a, I>(accounts: I, name: &str) -> Vec<UserAccount>
where
    I: IntoIterator<Item = &'a UserAccount> + Clone,
{
    let exact = exact_matches(accounts.clone(), name);
    if !exact.is_empty() {
        return exact;
    }

    let query = name.to_ascii_lowercase();
    accounts
        .into_iter()
        .filter(|account| account.name.to_ascii_lowercase().starts_with(&query))
        .cloned()
        .collect()
}

/// Directory kept in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    accounts: RwLock<Vec<UserAccount>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<UserAccount>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    pub fn insert(&self, account: UserAccount) {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.retain(|existing| existing.id != account.id);
            accounts.push(account);
        }
    }

    pub fn remove(&self, id: UserId) -> bool {
        match self.accounts.write() {
            Ok(mut accounts) => {
                let before = accounts.len();
                accounts.retain(|account| account.id != id);
                accounts.len() != before
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_name(&self, name: &str) -> OverrideResult<Vec<UserAccount>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| OverrideError::not_found("User directory is unavailable"))?;
        Ok(select_matches(accounts.iter(), name))
    }

    async fn find_exact(&self, name: &str) -> OverrideResult<Vec<UserAccount>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| OverrideError::not_found("User directory is unavailable"))?;
        Ok(exact_matches(accounts.iter(), name))
    }

    async fn find_by_id(&self, id: UserId) -> OverrideResult<Option<UserAccount>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| OverrideError::not_found("User directory is unavailable"))?;
        Ok(accounts.iter().find(|account| account.id == id).cloned())
    }
}

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
)";

/// Directory over the host's `users` table.
#[derive(Debug, Clone)]
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

fn account_from_row((id, name): (i64, String)) -> Option<UserAccount> {
    match i32::try_from(id).ok().and_then(|id| UserId::new(id).ok()) {
        Some(id) => Some(UserAccount { id, name }),
        None => {
            warn!("Skipping account '{}' with invalid id {}", name, id);
            None
        }
    }
}

impl SqliteUserDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_account(&self, name: &str) -> OverrideResult<UserAccount> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OverrideError::invalid("Account names cannot be empty"));
        }

        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(OverrideError::invalid(format!("An account named '{name}' already exists")));
        }

        let result = sqlx::query("INSERT INTO users (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let id = i32::try_from(result.last_insert_rowid())
            .ok()
            .and_then(|id| UserId::new(id).ok())
            .ok_or_else(|| OverrideError::invalid("Account id out of range"))?;

        info!("👤 Created account '{}' with id {}", name, id);
        Ok(UserAccount {
            id,
            name: name.to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_account(&self, id: UserId) -> OverrideResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> OverrideResult<Vec<UserAccount>> {
        let exact = self.find_exact(name).await?;
        if !exact.is_empty() {
            return Ok(exact);
        }

        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT id, name FROM users WHERE substr(lower(name), 1, length(?)) = lower(?) ORDER BY id",
        )
        .bind(name)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        debug!("{} accounts matched '{}'", rows.len(), name);
        Ok(rows.into_iter().filter_map(account_from_row).collect())
    }

    async fn find_exact(&self, name: &str) -> OverrideResult<Vec<UserAccount>> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM users WHERE lower(name) = lower(?) ORDER BY id")
                .bind(name)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().filter_map(account_from_row).collect())
    }

    async fn find_by_id(&self, id: UserId) -> OverrideResult<Option<UserAccount>> {
        let row: Option<(i64, String)> = sqlx::query_as("SELECT id, name FROM users WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(account_from_row))
    }
}
