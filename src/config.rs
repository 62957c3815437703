//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::account::MAX_ACCOUNT_ALIAS_LEN;
use crate::credentials::{Credentials, CredentialsError, resolve_api_secret};

/// Tier3 client configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "TIER3")]
pub struct Tier3Config {
    /// Base endpoint of the REST API, without the version segment.
    #[ortho_config(default = "https://api.tier3.com".to_owned())]
    pub endpoint: String,
    /// Account alias (at most four characters) owning the resources.
    pub account_alias: String,
    /// API key sent on logon.
    pub api_key: String,
    /// API secret sent on logon. Mutually exclusive with `api_secret_file`.
    pub api_secret: Option<String>,
    /// Path to a file holding the API secret. `~/` is expanded.
    pub api_secret_file: Option<String>,
    /// Optional HTTP proxy host.
    pub proxy_host: Option<String>,
    /// Port of the proxy; defaults to the scheme's port when omitted.
    pub proxy_port: Option<u16>,
    /// Lifetime of a cached session, in seconds. Defaults to four hours.
    #[ortho_config(default = 14_400)]
    pub session_ttl_secs: u64,
    /// Connection establishment timeout, in seconds.
    #[ortho_config(default = 10)]
    pub connect_timeout_secs: u64,
    /// Whole-exchange timeout, in seconds.
    #[ortho_config(default = 300)]
    pub request_timeout_secs: u64,
    /// Upper bound on GET exchanges running concurrently.
    #[ortho_config(default = 16)]
    pub max_concurrent_gets: usize,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl Tier3Config {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to [tier3] in tier3.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("tier3")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty,
    /// [`ConfigError::InvalidAccountAlias`] when the alias is too long, and
    /// [`ConfigError::Credentials`] when the secret sources conflict.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.endpoint,
            &FieldMetadata::new("API endpoint", "TIER3_ENDPOINT", "endpoint"),
        )?;
        Self::require_field(
            &self.account_alias,
            &FieldMetadata::new("account alias", "TIER3_ACCOUNT_ALIAS", "account_alias"),
        )?;
        Self::require_field(
            &self.api_key,
            &FieldMetadata::new("API key", "TIER3_API_KEY", "api_key"),
        )?;
        if self.api_secret.is_none() && self.api_secret_file.is_none() {
            return Err(ConfigError::MissingField(String::from(
                "missing API secret: set TIER3_API_SECRET or TIER3_API_SECRET_FILE, \
                 or add api_secret or api_secret_file to [tier3] in tier3.toml",
            )));
        }
        if self.api_secret.is_some() && self.api_secret_file.is_some() {
            return Err(ConfigError::Credentials(CredentialsError::BothProvided));
        }
        if self.account_alias.trim().chars().count() > MAX_ACCOUNT_ALIAS_LEN {
            return Err(ConfigError::InvalidAccountAlias(self.account_alias.clone()));
        }
        if self.max_concurrent_gets == 0 {
            return Err(ConfigError::Parse(String::from(
                "max_concurrent_gets must be at least 1",
            )));
        }
        Ok(())
    }

    /// Resolves the credential pair, reading the secret file when configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails or the secret cannot be
    /// resolved.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.validate()?;
        let secret = resolve_api_secret(
            self.api_secret.as_deref(),
            self.api_secret_file.as_deref(),
        )?;
        Ok(Credentials::new(self.api_key.trim(), secret))
    }

    /// Trimmed account alias.
    #[must_use]
    pub fn account(&self) -> &str {
        self.account_alias.trim()
    }

    /// Lifetime of a cached session.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Connection establishment timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whole-exchange timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates the account alias does not match the provider's format.
    #[error("invalid account alias `{0}`: aliases have at most four characters")]
    InvalidAccountAlias(String),
    /// Surfaces credential resolution failures.
    #[error("credential error: {0}")]
    Credentials(#[from] CredentialsError),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
