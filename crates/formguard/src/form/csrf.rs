//! CSRF token generation and verification.
//!
//! One token per session, stored through a [`SessionStore`] with an expiry.
//! Issuing is idempotent while the token is live so several forms on one
//! page share it. In single-use mode a verified token is marked consumed and
//! any replay is rejected as a mismatch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::CsrfConfig;
use crate::error::{ConfigError, CsrfFailure, SessionError};
use crate::session::SessionStore;

/// Source of token entropy.
pub trait TokenSource: Send + Sync {
    /// Fill `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]);
}

/// Default entropy source backed by the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl TokenSource for ThreadRngSource {
    fn fill(&self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}

/// Outcome of [`CsrfTokenManager::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Accepted,
    Rejected(CsrfFailure),
}

impl Verification {
    /// Whether the token was accepted.
    pub fn is_accepted(self) -> bool {
        matches!(self, Verification::Accepted)
    }
}

/// Token as persisted in the session.
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    #[serde(default)]
    consumed: bool,
}

/// Issues and verifies per-session CSRF tokens.
///
/// `issue` and `verify` for the same session are serialised, so two
/// concurrent verifications of a single-use token accept exactly once.
pub struct CsrfTokenManager {
    store: Arc<dyn SessionStore>,
    config: CsrfConfig,
    source: Box<dyn TokenSource>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CsrfTokenManager {
    /// Create a manager over `store`. Rejects configurations that weaken protection.
    pub fn new(store: Arc<dyn SessionStore>, config: CsrfConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            source: Box::new(ThreadRngSource),
            locks: DashMap::new(),
        })
    }

    /// Replace the entropy source.
    pub fn with_token_source(mut self, source: impl TokenSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Payload key the token is expected under.
    pub fn field_name(&self) -> &str {
        &self.config.field_name
    }

    /// Return the session's live token, creating one if needed.
    pub fn issue(&self, session_id: &str) -> Result<String, SessionError> {
        self.issue_at(session_id, Utc::now())
    }

    /// [`issue`](Self::issue) with an explicit clock.
    pub fn issue_at(&self, session_id: &str, now: DateTime<Utc>) -> Result<String, SessionError> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock();

        if let Some(entry) = self.store.get(session_id, &self.config.session_key)? {
            match decode(&entry.value) {
                Some(stored) if !stored.consumed && !entry.is_expired(now) => {
                    return Ok(stored.token);
                }
                Some(_) => {}
                None => warn!("discarding unreadable CSRF session entry"),
            }
        }

        let token = self.generate(now);
        let expires_at = self.expiry_from(now);
        self.store.set(
            session_id,
            &self.config.session_key,
            encode(&token, false),
            expires_at,
        )?;

        debug!(expires_at = %expires_at, "issued CSRF token");
        Ok(token)
    }

    /// Check a submitted token against the session.
    pub fn verify(&self, session_id: &str, submitted: &str) -> Result<Verification, SessionError> {
        self.verify_at(session_id, submitted, Utc::now())
    }

    /// [`verify`](Self::verify) with an explicit clock.
    pub fn verify_at(
        &self,
        session_id: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<Verification, SessionError> {
        if submitted.is_empty() {
            return Ok(reject(CsrfFailure::Missing));
        }

        let lock = self.lock_for(session_id);
        let _guard = lock.lock();

        let Some(entry) = self.store.get(session_id, &self.config.session_key)? else {
            return Ok(reject(CsrfFailure::Missing));
        };

        let Some(stored) = decode(&entry.value) else {
            warn!("unreadable CSRF session entry");
            return Ok(reject(CsrfFailure::Missing));
        };

        if entry.is_expired(now) {
            self.store.remove(session_id, &self.config.session_key)?;
            return Ok(reject(CsrfFailure::Expired));
        }

        let matches: bool = stored.token.as_bytes().ct_eq(submitted.as_bytes()).into();
        if stored.consumed || !matches {
            return Ok(reject(CsrfFailure::Mismatch));
        }

        if self.config.single_use {
            self.store.set(
                session_id,
                &self.config.session_key,
                encode(&stored.token, true),
                entry.expires_at,
            )?;
        }

        debug!(single_use = self.config.single_use, "CSRF token accepted");
        Ok(Verification::Accepted)
    }

    /// Drop the session's token, e.g. on logout.
    pub fn clear(&self, session_id: &str) -> Result<(), SessionError> {
        {
            let lock = self.lock_for(session_id);
            let _guard = lock.lock();
            self.store.remove(session_id, &self.config.session_key)?;
        }
        self.locks.remove(session_id);
        Ok(())
    }

    /// Reclaim expired store entries and idle per-session locks.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let removed = self.store.sweep_expired(now)?;
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(removed)
    }

    fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn generate(&self, now: DateTime<Utc>) -> String {
        let mut random_bytes = vec![0u8; self.config.token_bytes];
        self.source.fill(&mut random_bytes);

        let mut hasher = Sha256::new();
        hasher.update(&random_bytes);
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        hex::encode(hasher.finalize())
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.config.token_lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl std::fmt::Debug for CsrfTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfTokenManager")
            .field("config", &self.config)
            .finish()
    }
}

fn reject(failure: CsrfFailure) -> Verification {
    warn!(reason = failure.reason(), "CSRF token rejected");
    Verification::Rejected(failure)
}

fn encode(token: &str, consumed: bool) -> String {
    let stored = StoredToken {
        token: token.to_string(),
        consumed,
    };
    serde_json::to_string(&stored).unwrap_or_default()
}

fn decode(raw: &str) -> Option<StoredToken> {
    serde_json::from_str(raw).ok()
}
