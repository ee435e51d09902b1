//! Session-local copies of override records.
//!
//! A connected session keeps its user's record at hand for per-message
//! lookups. The store refreshes or drops these copies whenever it changes
//! the underlying record.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::record::{OverrideRecord, UserId};

/// Identifier of a connected session (a host player slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: UserId,
    record: Option<Arc<OverrideRecord>>,
}

#[derive(Debug, Default)]
pub struct SessionCache {
    sessions: DashMap<SessionId, SessionEntry>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, session: SessionId, user_id: UserId, record: Option<OverrideRecord>) {
        self.sessions.insert(
            session,
            SessionEntry {
                user_id,
                record: record.map(Arc::new),
            },
        );
    }

    pub fn detach(&self, session: SessionId) -> bool {
        self.sessions.remove(&session).is_some()
    }

    /// The record cached for `session`, if the session is known and has one.
    pub fn get(&self, session: SessionId) -> Option<Arc<OverrideRecord>> {
        self.sessions
            .get(&session)
            .and_then(|entry| entry.record.clone())
    }

    pub fn user_of(&self, session: SessionId) -> Option<UserId> {
        self.sessions.get(&session).map(|entry| entry.user_id)
    }

    /// Replace the cached copy in every session logged in as `user_id`.
    ///
    /// Passing `None` marks those sessions as having no record.
    pub fn refresh_user(&self, user_id: UserId, record: Option<&OverrideRecord>) -> usize {
        let shared = record.cloned().map(Arc::new);
        let mut refreshed = 0;
        for mut entry in self.sessions.iter_mut() {
            if entry.user_id == user_id {
                entry.record = shared.clone();
                refreshed += 1;
            }
        }
        refreshed
    }

    /// Distinct users with at least one attached session.
    pub fn users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.sessions.iter().map(|entry| entry.user_id).collect();
        users.sort();
        users.dedup();
        users
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&self) {
        self.sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ChatAttributes;

    fn record(id: i32, prefix: &str) -> OverrideRecord {
        OverrideRecord::new(
            UserId::new(id).unwrap(),
            ChatAttributes {
                prefix: Some(prefix.to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_attach_get_detach() {
        let cache = SessionCache::new();
        let user = UserId::new(1).unwrap();
        cache.attach(SessionId(4), user, Some(record(1, "A")));

        assert_eq!(cache.user_of(SessionId(4)), Some(user));
        assert_eq!(cache.get(SessionId(4)).unwrap().chat.prefix.as_deref(), Some("A"));
        assert!(cache.detach(SessionId(4)));
        assert!(cache.get(SessionId(4)).is_none());
        assert!(!cache.detach(SessionId(4)));
    }

    #[test]
    fn test_refresh_only_touches_matching_user() {
        let cache = SessionCache::new();
        cache.attach(SessionId(1), UserId::new(1).unwrap(), Some(record(1, "old")));
        cache.attach(SessionId(2), UserId::new(1).unwrap(), None);
        cache.attach(SessionId(3), UserId::new(2).unwrap(), Some(record(2, "other")));

        let refreshed = cache.refresh_user(UserId::new(1).unwrap(), Some(&record(1, "new")));
        assert_eq!(refreshed, 2);
        assert_eq!(cache.get(SessionId(1)).unwrap().chat.prefix.as_deref(), Some("new"));
        assert_eq!(cache.get(SessionId(2)).unwrap().chat.prefix.as_deref(), Some("new"));
        assert_eq!(cache.get(SessionId(3)).unwrap().chat.prefix.as_deref(), Some("other"));

        cache.refresh_user(UserId::new(1).unwrap(), None);
        assert!(cache.get(SessionId(1)).is_none());
        assert_eq!(cache.user_of(SessionId(1)), Some(UserId::new(1).unwrap()));
    }
}
