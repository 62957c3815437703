//! API credential handling.
//!
//! The API secret can be provided either inline or via a file path. This
//! module centralises the branching and file loading logic so configuration
//! and CLI paths stay consistent, and derives the fingerprint that keys cached
//! sessions.

use std::fmt;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::util::expand_tilde;

/// Errors raised while resolving credentials.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CredentialsError {
    /// Raised when both inline and file sources are provided.
    #[error("the API secret cannot be provided both inline and via file")]
    BothProvided,
    /// Raised when neither source is provided.
    #[error("no API secret was provided")]
    Missing,
    /// Raised when an inline secret is empty or only whitespace.
    #[error("the API secret must not be empty")]
    InlineEmpty,
    /// Raised when a file path is empty or only whitespace.
    #[error("the API secret file path must not be empty")]
    FilePathEmpty,
    /// Raised when a file resolves to empty or only whitespace.
    #[error("the API secret file must not be empty")]
    FileEmpty,
    /// Raised when reading the file source fails.
    #[error("failed to read API secret file `{path}`: {message}")]
    FileRead {
        /// Expanded path that failed to read.
        path: String,
        /// Underlying error message.
        message: String,
    },
}

/// API key and secret pair used to obtain a session.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// API key sent as `APIKey` on logon.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// API secret sent as `Password` on logon.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Returns a hex SHA-256 digest of the account alias and credentials.
    ///
    /// Cached sessions are keyed by this value, so changing either half of
    /// the credential pair forces a fresh logon without keeping the secret
    /// itself in the cache key.
    #[must_use]
    pub fn fingerprint(&self, account_alias: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [account_alias, &self.api_key, &self.api_secret] {
            hasher.update(part.as_bytes());
            hasher.update([0_u8]);
        }
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Resolves the API secret from either an inline value or a file.
///
/// Inline and file sources are mutually exclusive and exactly one is
/// required. Surrounding whitespace is stripped from file contents so a
/// trailing newline does not end up in the logon payload.
///
/// # Errors
///
/// Returns [`CredentialsError`] when the inputs are invalid or the file cannot
/// be read.
pub fn resolve_api_secret(
    inline: Option<&str>,
    file: Option<&str>,
) -> Result<String, CredentialsError> {
    if inline.is_some() && file.is_some() {
        return Err(CredentialsError::BothProvided);
    }

    if let Some(secret) = inline {
        validate_secret(secret)?;
        return Ok(secret.to_owned());
    }

    let Some(path) = file else {
        return Err(CredentialsError::Missing);
    };

    if path.trim().is_empty() {
        return Err(CredentialsError::FilePathEmpty);
    }

    let expanded = expand_tilde(path);
    let content =
        read_to_string_ambient(&expanded).map_err(|message| CredentialsError::FileRead {
            path: expanded.clone(),
            message,
        })?;

    validate_secret(&content).map_err(|err| match err {
        CredentialsError::InlineEmpty => CredentialsError::FileEmpty,
        other => other,
    })?;

    Ok(content.trim().to_owned())
}

fn validate_secret(secret: &str) -> Result<(), CredentialsError> {
    if secret.trim().is_empty() {
        return Err(CredentialsError::InlineEmpty);
    }
    Ok(())
}

fn read_to_string_ambient(path: &str) -> Result<String, String> {
    let path_buf = Utf8Path::new(path);

    let (dir_path, file_path) = if path_buf.is_absolute() {
        let parent = path_buf
            .parent()
            .ok_or_else(|| format!("path has no parent directory: {path_buf}"))?;
        let file_name = path_buf
            .file_name()
            .ok_or_else(|| format!("path has no file name: {path_buf}"))?;
        (parent, Utf8Path::new(file_name))
    } else {
        (Utf8Path::new("."), path_buf)
    };

    let dir =
        Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| err.to_string())?;
    dir.read_to_string(file_path).map_err(|err| err.to_string())
}
