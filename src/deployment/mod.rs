//! Long-running operation polling.
//!
//! Mutating calls such as server creation answer with a `RequestID` only. The
//! outcome becomes visible later through the deployment-status resource,
//! which [`DeploymentPoller`] queries at a fixed interval until it reports a
//! resource identifier or the bound for the operation elapses. Elapsed bounds
//! yield `None`: the operation is unconfirmed, not failed.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};

/// Resource reporting the progress of a long-running operation.
pub const DEPLOYMENT_STATUS_RESOURCE: &str = "Blueprint/GetDeploymentStatus/JSON";

/// Interval between two status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Boxed future returned by [`StatusSource`] implementations.
pub type StatusFuture<'a> =
    Pin<Box<dyn Future<Output = Result<DeploymentStatus, ApiError>> + Send + 'a>>;

/// Deployment-status document returned by the provider.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentStatus {
    /// Correlation identifier of the operation.
    #[serde(rename = "RequestID", default)]
    pub request_id: Option<i64>,
    /// Identifiers of resources the operation made available so far.
    #[serde(default, deserialize_with = "nullable_list")]
    pub servers: Vec<String>,
    /// Success indicator; `Some(false)` means the operation failed.
    #[serde(default)]
    pub success: Option<bool>,
    /// Provider message accompanying the status.
    #[serde(default)]
    pub message: Option<String>,
    /// Progress of the operation in percent.
    #[serde(default)]
    pub percent_complete: Option<f64>,
    /// Provider description of the current step.
    #[serde(default)]
    pub current_status: Option<String>,
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        })
        .collect())
}

impl DeploymentStatus {
    /// First resource identifier reported, if any.
    #[must_use]
    pub fn first_resource(&self) -> Option<&str> {
        self.servers.first().map(String::as_str)
    }
}

/// Kinds of long-running operation, each with its own wait bound.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationKind {
    /// Creating a server.
    Provision,
    /// Changing a server's size.
    Resize,
    /// Snapshotting a server.
    Snapshot,
    /// Deleting a server.
    Delete,
}

impl OperationKind {
    /// Maximum time to wait for the operation to report a resource.
    #[must_use]
    pub const fn timeout(self) -> Duration {
        match self {
            Self::Provision | Self::Resize => Duration::from_secs(2 * 60),
            Self::Snapshot | Self::Delete => Duration::from_secs(60),
        }
    }
}

/// Source of deployment-status documents.
pub trait StatusSource: Send + Sync {
    /// Fetches the status of `request_id`.
    fn deployment_status(&self, request_id: i64) -> StatusFuture<'_>;
}

impl StatusSource for ApiClient {
    fn deployment_status(&self, request_id: i64) -> StatusFuture<'_> {
        Box::pin(query_status(self, request_id))
    }
}

/// Queries the deployment status of `request_id` once.
///
/// # Errors
///
/// Returns [`ApiError::DeploymentFailed`] when the provider reports
/// `Success: false`, [`ApiError::Parse`] when the document is missing or
/// malformed, and any error raised by the POST itself.
pub async fn query_status(
    client: &ApiClient,
    request_id: i64,
) -> Result<DeploymentStatus, ApiError> {
    let response = client
        .post(DEPLOYMENT_STATUS_RESOURCE, &json!({ "RequestId": request_id }))
        .await?;
    let document = response.json().await?.ok_or_else(|| ApiError::Parse {
        message: format!("no deployment status returned for request {request_id}"),
    })?;
    let status: DeploymentStatus = serde_json::from_value(document)?;
    if status.success == Some(false) {
        return Err(ApiError::DeploymentFailed {
            request_id,
            message: status.message.unwrap_or_default(),
        });
    }
    Ok(status)
}

/// Extracts the `RequestID` from the response of a mutating call.
///
/// # Errors
///
/// Returns [`ApiError::DeploymentFailed`] when the response reports
/// `Success: false` and [`ApiError::Parse`] when it carries no numeric
/// `RequestID`.
pub fn request_id(document: &Value) -> Result<i64, ApiError> {
    let id = document.get("RequestID").and_then(Value::as_i64);
    if document.get("Success").and_then(Value::as_bool) == Some(false) {
        return Err(ApiError::DeploymentFailed {
            request_id: id.unwrap_or_default(),
            message: document
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        });
    }
    id.ok_or_else(|| ApiError::Parse {
        message: String::from("response carried no RequestID"),
    })
}

/// Polls the deployment-status resource at a fixed interval.
#[derive(Clone, Debug)]
pub struct DeploymentPoller<S> {
    source: S,
    poll_interval: Duration,
    timeout: Duration,
}

impl<S: StatusSource> DeploymentPoller<S> {
    /// Creates a poller bounded by the timeout of `kind`.
    #[must_use]
    pub const fn new(source: S, kind: OperationKind) -> Self {
        Self {
            source,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: kind.timeout(),
        }
    }

    /// Overrides the interval between polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the total wait bound.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Status source queried by the poller.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Deadline for a wait starting now; `None` when the bound reaches past
    /// what `Instant` can represent, so the wait is unbounded.
    fn deadline(&self) -> Option<Instant> {
        Instant::now().checked_add(self.timeout)
    }

    /// Waits until the operation reports a resource and returns its
    /// identifier, or `None` once the bound elapses.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a status query, including
    /// [`ApiError::DeploymentFailed`].
    pub async fn wait_for_resource(&self, request_id: i64) -> Result<Option<String>, ApiError> {
        let deadline = self.deadline();
        loop {
            let status = self.source.deployment_status(request_id).await?;
            if let Some(resource) = status.first_resource() {
                info!(request_id, resource, "deployment reported a resource");
                return Ok(Some(resource.to_owned()));
            }
            debug!(
                request_id,
                percent_complete = ?status.percent_complete,
                current_status = ?status.current_status,
                "deployment still in progress"
            );
            if passes(deadline, self.poll_interval) {
                warn!(request_id, "deployment unconfirmed when the wait bound elapsed");
                return Ok(None);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Polls `probe` until it yields a value, or returns `None` once the
    /// bound elapses. Probe errors are logged and treated as "not yet".
    pub async fn poll_until_visible<T, F, Fut>(&self, mut probe: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, ApiError>>,
    {
        let deadline = self.deadline();
        while !passes(deadline, Duration::ZERO) {
            match probe().await {
                Ok(Some(value)) => return Some(value),
                Ok(None) => {}
                Err(err) => debug!(error = %err, "probe failed; retrying"),
            }
            sleep(self.poll_interval).await;
        }
        None
    }
}

/// Returns `true` when `wait` from now ends past `deadline`.
fn passes(deadline: Option<Instant>, wait: Duration) -> bool {
    deadline.is_some_and(|deadline| {
        Instant::now()
            .checked_add(wait)
            .is_none_or(|resumes_at| resumes_at > deadline)
    })
}
