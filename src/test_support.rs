//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;

use tokio::sync::{Mutex, MutexGuard};

use crate::api::SESSION_COOKIE_NAME;

/// Environment variables read by the configuration loader.
pub const TIER3_ENV_VARS: [&str; 11] = [
    "TIER3_ENDPOINT",
    "TIER3_ACCOUNT_ALIAS",
    "TIER3_API_KEY",
    "TIER3_API_SECRET",
    "TIER3_API_SECRET_FILE",
    "TIER3_PROXY_HOST",
    "TIER3_PROXY_PORT",
    "TIER3_SESSION_TTL_SECS",
    "TIER3_CONNECT_TIMEOUT_SECS",
    "TIER3_REQUEST_TIMEOUT_SECS",
    "TIER3_MAX_CONCURRENT_GETS",
];

/// Global mutex serialising environment mutation across tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut env_guard = Self {
            previous: Vec::with_capacity(pairs.len()),
            _guard: guard,
        };
        env_guard.apply(pairs);
        env_guard
    }

    /// Clears every `TIER3_*` configuration variable, then sets `pairs`.
    pub async fn isolated(pairs: &[(&str, &str)]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut env_guard = Self {
            previous: Vec::with_capacity(TIER3_ENV_VARS.len() + pairs.len()),
            _guard: guard,
        };
        for key in TIER3_ENV_VARS {
            env_guard.previous.push((key.to_owned(), env::var_os(key)));
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
            unsafe { env::remove_var(key) };
        }
        env_guard.apply(pairs);
        env_guard
    }

    fn apply(&mut self, pairs: &[(&str, &str)]) {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard"
        );
        for (key, value) in pairs {
            self.previous.push(((*key).to_owned(), env::var_os(key)));
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
            unsafe { env::set_var(key, value) };
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // restore in reverse so the first recorded value wins
        for (key, old) in self.previous.iter().rev() {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

/// Builds the `Set-Cookie` header value the logon resource returns for
/// `token`.
#[must_use]
pub fn session_set_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE_NAME}={token}; path=/; HttpOnly")
}

/// Builds the `Cookie` header value sent after logging on with `token`.
#[must_use]
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE_NAME}={token}")
}
