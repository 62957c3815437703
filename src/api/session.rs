//! Session cache used to reuse logon cookies across calls.
//!
//! The cache is injected into the client rather than held in ambient state.
//! Entries are keyed by account alias and credential fingerprint and expire
//! after an explicit time-to-live.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default lifetime of a cached session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(4 * 60 * 60);

/// Key identifying the credentials that produced a session.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SessionKey {
    account: String,
    fingerprint: String,
}

impl SessionKey {
    /// Creates a key for `account` and a credential `fingerprint`.
    #[must_use]
    pub fn new(account: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// Account alias the session belongs to.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Fingerprint of the credentials that produced the session.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Session token together with its expiry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CachedSession {
    /// Cookie value sent on authenticated calls.
    pub token: String,
    /// Instant after which the session is no longer reused; `None` when the
    /// time-to-live reaches past what `Instant` can represent.
    pub expires_at: Option<Instant>,
}

impl CachedSession {
    /// Returns `true` when the session may still be reused at `now`.
    #[must_use]
    pub fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Narrow get/put interface over session storage.
///
/// Implementations must tolerate concurrent first calls racing to populate the
/// same key; the worst case is a redundant logon.
pub trait SessionCache: Send + Sync {
    /// Returns the live token for `key`, if one is cached.
    fn get(&self, key: &SessionKey) -> Option<String>;

    /// Stores `token` for `key`, expiring after `ttl`.
    fn put(&self, key: SessionKey, token: String, ttl: Duration);
}

/// Process-local session cache.
#[derive(Debug, Default)]
pub struct InMemorySessionCache {
    entries: Mutex<HashMap<SessionKey, CachedSession>>,
}

impl InMemorySessionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, live or expired.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionCache for InMemorySessionCache {
    fn get(&self, key: &SessionKey) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match entries.get(key) {
            Some(session) if session.is_live(now) => Some(session.token.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: SessionKey, token: String, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, CachedSession { token, expires_at });
    }
}
