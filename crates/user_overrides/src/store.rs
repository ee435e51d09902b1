//! The override store: a write-through cache in front of [`OverrideStorage`].
//!
//! Every mutation holds the cache write lock for the whole storage call, so
//! the cache, the database and any attached sessions change together. The
//! database is written first; the cache is only touched after a commit.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::error::{OverrideError, OverrideResult, StorageError};
use crate::record::{OverrideRecord, UserId};
use crate::session::{SessionCache, SessionId};
use crate::storage::OverrideStorage;

/// What [`OverrideStore::modify`] did to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modification {
    /// A new record was stored.
    Created,
    /// An existing record was rewritten.
    Updated,
    /// The record became empty and was deleted.
    Removed,
    /// Nothing needed to be written.
    Unchanged,
}

pub struct OverrideStore {
    storage: Arc<dyn OverrideStorage>,
    records: RwLock<HashMap<UserId, OverrideRecord>>,
    sessions: SessionCache,
}

fn log_failure(operation: &'static str, user_id: Option<UserId>) -> impl FnOnce(StorageError) -> OverrideError {
    move |e| {
        match user_id {
            Some(user_id) => error!("❌ Failed to {} override record for user {}: {}", operation, user_id, e),
            None => error!("❌ Failed to {} override records: {}", operation, e),
        }
        OverrideError::StorageFailure(e)
    }
}

impl OverrideStore {
    pub fn new(storage: Arc<dyn OverrideStorage>) -> Self {
        Self {
            storage,
            records: RwLock::new(HashMap::new()),
            sessions: SessionCache::new(),
        }
    }

    /// Replace the cache with the current contents of storage.
    ///
    /// Attached sessions are refreshed from the new contents.
    #[instrument(skip(self))]
    pub async fn load(&self) -> OverrideResult<usize> {
        let mut records = self.records.write().await;

        let loaded = self
            .storage
            .load_all()
            .await
            .map_err(log_failure("load", None))?;

        *records = loaded
            .into_iter()
            .map(|record| (record.user_id(), record))
            .collect();

        for user_id in self.sessions.users() {
            self.sessions.refresh_user(user_id, records.get(&user_id));
        }

        info!("📋 Loaded {} user override records", records.len());
        Ok(records.len())
    }

    /// A copy of the record for `user_id`, if one exists.
    pub async fn get(&self, user_id: UserId) -> Option<OverrideRecord> {
        self.records.read().await.get(&user_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Store a record for a user who has none yet.
    ///
    /// An empty record is rejected with `InvalidArgument`.
    #[instrument(skip(self, record), fields(user_id = %record.user_id()))]
    pub async fn add(&self, record: OverrideRecord) -> OverrideResult<()> {
        let mut records = self.records.write().await;
        let user_id = record.user_id();

        if records.contains_key(&user_id) {
            return Err(OverrideError::DuplicateKey(user_id));
        }
        if record.is_empty() {
            return Err(OverrideError::invalid(format!(
                "Refusing to store an empty override record for user {user_id}"
            )));
        }

        self.storage
            .insert(&record)
            .await
            .map_err(log_failure("add", Some(user_id)))?;

        self.sessions.refresh_user(user_id, Some(&record));
        records.insert(user_id, record);
        debug!("Added override record");
        Ok(())
    }

    /// Persist every field of an existing record, replacing its permissions.
    ///
    /// An empty record deletes the stored one. On a storage failure nothing is
    /// changed and the error is returned.
    #[instrument(skip(self, record), fields(user_id = %record.user_id()))]
    pub async fn update(&self, record: OverrideRecord) -> OverrideResult<()> {
        let mut records = self.records.write().await;
        let user_id = record.user_id();

        if !records.contains_key(&user_id) {
            return Err(OverrideError::not_found(format!(
                "User {user_id} has no override record"
            )));
        }

        if record.is_empty() {
            self.storage
                .delete(user_id)
                .await
                .map_err(log_failure("remove", Some(user_id)))?;
            self.sessions.refresh_user(user_id, None);
            records.remove(&user_id);
            debug!("Update emptied the record; removed it");
            return Ok(());
        }

        self.storage
            .replace(&record)
            .await
            .map_err(log_failure("update", Some(user_id)))?;

        self.sessions.refresh_user(user_id, Some(&record));
        records.insert(user_id, record);
        debug!("Updated override record");
        Ok(())
    }

    /// Delete the record for `user_id`. Returns whether one existed.
    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId) -> OverrideResult<bool> {
        let mut records = self.records.write().await;

        let existed_in_storage = self
            .storage
            .delete(user_id)
            .await
            .map_err(log_failure("remove", Some(user_id)))?;

        self.sessions.refresh_user(user_id, None);
        let existed_in_cache = records.remove(&user_id).is_some();
        Ok(existed_in_cache || existed_in_storage)
    }

    /// Get-or-create the record for `user_id` and apply `change` to it.
    ///
    /// Empty records are never kept: a change that leaves the record without
    /// display attributes and permissions deletes it.
    #[instrument(skip(self, change))]
    pub async fn modify<F>(&self, user_id: UserId, change: F) -> OverrideResult<Modification>
    where
        F: FnOnce(&mut OverrideRecord),
    {
        let mut records = self.records.write().await;
        let existing = records.get(&user_id);

        let mut candidate = existing
            .cloned()
            .unwrap_or_else(|| OverrideRecord::empty(user_id));
        change(&mut candidate);

        let outcome = match existing {
            None if candidate.is_empty() => Modification::Unchanged,
            None => {
                self.storage
                    .insert(&candidate)
                    .await
                    .map_err(log_failure("create", Some(user_id)))?;
                Modification::Created
            }
            Some(_) if candidate.is_empty() => {
                self.storage
                    .delete(user_id)
                    .await
                    .map_err(log_failure("remove", Some(user_id)))?;
                Modification::Removed
            }
            Some(current) if *current == candidate => Modification::Unchanged,
            Some(_) => {
                self.storage
                    .replace(&candidate)
                    .await
                    .map_err(log_failure("update", Some(user_id)))?;
                Modification::Updated
            }
        };

        match outcome {
            Modification::Created | Modification::Updated => {
                self.sessions.refresh_user(user_id, Some(&candidate));
                records.insert(user_id, candidate);
            }
            Modification::Removed => {
                self.sessions.refresh_user(user_id, None);
                records.remove(&user_id);
            }
            Modification::Unchanged => {}
        }

        debug!("Modification outcome: {:?}", outcome);
        Ok(outcome)
    }

    /// Delete every record that carries nothing. Returns how many were deleted.
    #[instrument(skip(self))]
    pub async fn purge_empty(&self) -> OverrideResult<usize> {
        let mut records = self.records.write().await;
        let empty: Vec<UserId> = records
            .values()
            .filter(|record| record.is_empty())
            .map(OverrideRecord::user_id)
            .collect();

        for user_id in &empty {
            self.storage
                .delete(*user_id)
                .await
                .map_err(log_failure("purge", Some(*user_id)))?;
            records.remove(user_id);
            self.sessions.refresh_user(*user_id, None);
        }

        if !empty.is_empty() {
            info!("🧹 Purged {} empty override records", empty.len());
        }
        Ok(empty.len())
    }

    /// Attach `session` to `user_id`, caching the user's current record.
    pub async fn login(&self, session: SessionId, user_id: UserId) -> Option<Arc<OverrideRecord>> {
        // Read lock held while attaching so no update slips in between.
        let records = self.records.read().await;
        self.sessions.attach(session, user_id, records.get(&user_id).cloned());
        self.sessions.get(session)
    }

    pub fn logout(&self, session: SessionId) -> bool {
        self.sessions.detach(session)
    }

    /// The record cached for `session`.
    pub fn session_record(&self, session: SessionId) -> Option<Arc<OverrideRecord>> {
        self.sessions.get(session)
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }
}
