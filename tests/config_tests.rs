//! Unit tests for configuration loading, validation and credential resolution.

use std::time::Duration;

use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use rstest::*;
use tempfile::TempDir;

use tier3::config::ConfigError;
use tier3::test_support::EnvGuard;
use tier3::{ApiClient, CredentialsError, Tier3Config};

#[fixture]
fn valid_config() -> Tier3Config {
    Tier3Config {
        endpoint: String::from("https://api.tier3.example"),
        account_alias: String::from("ACME"),
        api_key: String::from("0123456789abcdef"),
        api_secret: Some(String::from("s3cret")),
        api_secret_file: None,
        proxy_host: None,
        proxy_port: None,
        session_ttl_secs: 14_400,
        connect_timeout_secs: 10,
        request_timeout_secs: 300,
        max_concurrent_gets: 16,
    }
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> String {
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
    Dir::open_ambient_dir(&root, ambient_authority())
        .unwrap_or_else(|err| panic!("open temp dir: {err}"))
        .write(name, contents)
        .unwrap_or_else(|err| panic!("write {name}: {err}"));
    root.join(name).into_string()
}

/// Verifies that validation produces actionable errors mentioning both the
/// environment variable and configuration file for each required field.
#[rstest]
#[case::endpoint(|cfg: &mut Tier3Config| cfg.endpoint.clear(), "TIER3_ENDPOINT", "endpoint")]
#[case::account(|cfg: &mut Tier3Config| cfg.account_alias = String::from("  "), "TIER3_ACCOUNT_ALIAS", "account_alias")]
#[case::api_key(|cfg: &mut Tier3Config| cfg.api_key.clear(), "TIER3_API_KEY", "api_key")]
#[case::secret(|cfg: &mut Tier3Config| cfg.api_secret = None, "TIER3_API_SECRET", "api_secret")]
fn config_validation_produces_actionable_errors(
    valid_config: Tier3Config,
    #[case] mutate: fn(&mut Tier3Config),
    #[case] env_var: &str,
    #[case] toml_key: &str,
) {
    let mut cfg = valid_config;
    mutate(&mut cfg);

    let error = cfg.validate().expect_err("validation should fail");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error, got {error}");
    };
    assert!(
        message.contains(env_var),
        "error should mention env var {env_var}: {message}"
    );
    assert!(
        message.contains("tier3.toml"),
        "error should mention config file: {message}"
    );
    assert!(
        message.contains(toml_key),
        "error should mention TOML key {toml_key}: {message}"
    );
}

#[rstest]
fn config_rejects_long_account_alias(valid_config: Tier3Config) {
    let cfg = Tier3Config {
        account_alias: String::from("ACMEX"),
        ..valid_config
    };

    assert_eq!(
        cfg.validate(),
        Err(ConfigError::InvalidAccountAlias(String::from("ACMEX")))
    );
}

#[rstest]
fn config_rejects_inline_and_file_secret_together(valid_config: Tier3Config) {
    let cfg = Tier3Config {
        api_secret_file: Some(String::from("/etc/tier3/secret")),
        ..valid_config
    };

    assert_eq!(
        cfg.validate(),
        Err(ConfigError::Credentials(CredentialsError::BothProvided))
    );
}

#[rstest]
fn config_rejects_zero_concurrency(valid_config: Tier3Config) {
    let cfg = Tier3Config {
        max_concurrent_gets: 0,
        ..valid_config
    };

    let err = cfg.validate().expect_err("zero workers should fail");
    assert!(err.to_string().contains("max_concurrent_gets"), "{err}");
}

#[rstest]
fn config_exposes_durations_and_trimmed_account(valid_config: Tier3Config) {
    let cfg = Tier3Config {
        account_alias: String::from(" ACME "),
        ..valid_config
    };

    assert_eq!(cfg.account(), "ACME");
    assert_eq!(cfg.session_ttl(), Duration::from_secs(14_400));
    assert_eq!(cfg.connect_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.request_timeout(), Duration::from_secs(300));
}

#[rstest]
fn credentials_use_inline_secret(valid_config: Tier3Config) {
    let credentials = valid_config
        .credentials()
        .unwrap_or_else(|err| panic!("credentials: {err}"));

    assert_eq!(credentials.api_key(), "0123456789abcdef");
    assert_eq!(credentials.api_secret(), "s3cret");
}

#[rstest]
fn credentials_read_secret_file_and_trim_it(valid_config: Tier3Config) {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = write_file(&tmp, "secret.txt", "from-file\n");
    let cfg = Tier3Config {
        api_secret: None,
        api_secret_file: Some(path),
        ..valid_config
    };

    let credentials = cfg
        .credentials()
        .unwrap_or_else(|err| panic!("credentials: {err}"));

    assert_eq!(credentials.api_secret(), "from-file");
}

#[rstest]
fn credentials_reject_whitespace_secret_file(valid_config: Tier3Config) {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let path = write_file(&tmp, "secret.txt", "   \n\t ");
    let cfg = Tier3Config {
        api_secret: None,
        api_secret_file: Some(path),
        ..valid_config
    };

    assert_eq!(
        cfg.credentials(),
        Err(ConfigError::Credentials(CredentialsError::FileEmpty))
    );
}

#[rstest]
fn credentials_report_missing_secret_file(valid_config: Tier3Config) {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let missing = tmp.path().join("does-not-exist.txt");
    let missing_str = missing
        .to_str()
        .unwrap_or_else(|| panic!("temp path should be utf8: {}", missing.display()))
        .to_owned();
    let cfg = Tier3Config {
        api_secret: None,
        api_secret_file: Some(missing_str.clone()),
        ..valid_config
    };

    let err = cfg.credentials().expect_err("missing file should fail");
    let ConfigError::Credentials(CredentialsError::FileRead { path, .. }) = err else {
        panic!("expected FileRead error, got {err}");
    };
    assert_eq!(path, missing_str);
}

#[tokio::test]
async fn credentials_expand_tilde_in_secret_file() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let home = tmp.path().to_string_lossy().into_owned();
    let _guard = EnvGuard::set_vars(&[("HOME", home.as_str())]).await;
    write_file(&tmp, "tier3-secret", "tilde-secret");

    let cfg = Tier3Config {
        api_secret: None,
        api_secret_file: Some(String::from("~/tier3-secret")),
        ..valid_config()
    };

    let credentials = cfg
        .credentials()
        .unwrap_or_else(|err| panic!("credentials: {err}"));
    assert_eq!(credentials.api_secret(), "tilde-secret");
}

#[rstest]
fn client_builds_from_config(valid_config: Tier3Config) {
    let cfg = Tier3Config {
        proxy_host: Some(String::from("proxy.internal")),
        proxy_port: Some(3128),
        ..valid_config
    };

    let client = ApiClient::from_config(&cfg).unwrap_or_else(|err| panic!("client: {err}"));

    assert_eq!(client.endpoint(), "https://api.tier3.example");
    assert_eq!(client.account(), "ACME");
}

#[rstest]
fn client_rejects_invalid_config(valid_config: Tier3Config) {
    let cfg = Tier3Config {
        api_key: String::new(),
        ..valid_config
    };

    let err = ApiClient::from_config(&cfg).expect_err("invalid config should fail");
    assert!(matches!(err, tier3::ApiError::Configuration(_)), "{err}");
}

#[tokio::test]
async fn config_loads_from_environment() {
    let _guard = EnvGuard::isolated(&[
        ("TIER3_ACCOUNT_ALIAS", "ACME"),
        ("TIER3_API_KEY", "env-key"),
        ("TIER3_API_SECRET", "env-secret"),
        ("TIER3_MAX_CONCURRENT_GETS", "4"),
    ])
    .await;

    let cfg = Tier3Config::load_without_cli_args()
        .unwrap_or_else(|err| panic!("load config: {err}"));

    assert_eq!(cfg.account(), "ACME");
    assert_eq!(cfg.api_key, "env-key");
    assert_eq!(cfg.api_secret.as_deref(), Some("env-secret"));
    assert_eq!(cfg.max_concurrent_gets, 4);
    assert_eq!(cfg.endpoint, "https://api.tier3.com");
    assert_eq!(cfg.session_ttl_secs, 14_400);
    assert!(cfg.validate().is_ok());
}
