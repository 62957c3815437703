//! Account context verification.

use serde_json::{Value, json};
use tracing::{error, warn};

use crate::api::{ApiClient, ApiError};

/// Resource returning the details of an account.
pub const ACCOUNT_DETAILS_RESOURCE: &str = "Account/GetAccountDetails/JSON";

/// Longest account alias the provider issues.
pub const MAX_ACCOUNT_ALIAS_LEN: usize = 4;

/// Verifies that the client's credentials can read its own account.
///
/// Returns the alias reported by the provider, or `None` when the alias is
/// malformed or the lookup fails for any reason. Failures are logged rather
/// than raised.
pub async fn check_context(client: &ApiClient) -> Option<String> {
    let account = client.account();
    if account.chars().count() > MAX_ACCOUNT_ALIAS_LEN {
        warn!(account, "invalid account alias");
        return None;
    }
    match fetch_account_alias(client, account).await {
        Ok(alias) => alias,
        Err(err) => {
            error!(account, error = %err, "error querying account details");
            None
        }
    }
}

async fn fetch_account_alias(
    client: &ApiClient,
    account: &str,
) -> Result<Option<String>, ApiError> {
    let response = client
        .post(ACCOUNT_DETAILS_RESOURCE, &json!({ "AccountAlias": account }))
        .await?;
    let Some(document) = response.json().await? else {
        return Ok(None);
    };
    if document.get("Success").and_then(Value::as_bool) == Some(false) {
        return Err(ApiError::Api {
            status: response.status().await?,
            reason: String::from("account lookup rejected"),
            body: document
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        });
    }
    Ok(document
        .get("AccountDetails")
        .and_then(|details| details.get("AccountAlias"))
        .and_then(Value::as_str)
        .map(str::to_owned))
}
