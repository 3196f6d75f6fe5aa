//! Session storage interface used by the CSRF token manager.
//!
//! Real deployments back this with whatever session layer the application
//! already runs. [`MemorySessionStore`] is an in-process implementation for
//! tests and single-node setups.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::error::SessionError;

/// A stored value and the instant after which it is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionEntry {
    /// Whether the entry is stale at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Per-session key/value storage with expiry.
///
/// Stores return entries as written, even when past `expires_at`; callers
/// decide what an expired entry means. Implementations must be safe to share
/// across threads.
pub trait SessionStore: Send + Sync {
    /// Read `key` for `session_id`.
    fn get(&self, session_id: &str, key: &str) -> Result<Option<SessionEntry>, SessionError>;

    /// Write `key` for `session_id`, replacing any previous value.
    fn set(
        &self,
        session_id: &str,
        key: &str,
        value: String,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SessionError>;

    /// Delete `key` for `session_id`. Deleting a missing key is not an error.
    fn remove(&self, session_id: &str, key: &str) -> Result<(), SessionError>;

    /// Drop entries that expired before `now`, returning how many were removed.
    ///
    /// Stores with their own TTL handling can keep the default no-op.
    fn sweep_expired(&self, _now: DateTime<Utc>) -> Result<usize, SessionError> {
        Ok(0)
    }
}

/// In-memory session store keyed by `(session_id, key)`.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<(String, String), SessionEntry>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str, key: &str) -> Result<Option<SessionEntry>, SessionError> {
        let entry = self
            .entries
            .get(&(session_id.to_string(), key.to_string()))
            .map(|e| e.value().clone());
        Ok(entry)
    }

    fn set(
        &self,
        session_id: &str,
        key: &str,
        value: String,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.entries.insert(
            (session_id.to_string(), key.to_string()),
            SessionEntry { value, expires_at },
        );
        Ok(())
    }

    fn remove(&self, session_id: &str, key: &str) -> Result<(), SessionError> {
        self.entries.remove(&(session_id.to_string(), key.to_string()));
        Ok(())
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "swept expired session entries");
        }
        Ok(removed)
    }
}
