//! Request descriptors and endpoint construction.

use reqwest::{Method, Url};
use serde_json::Value;
use tracing::trace;

use super::error::ApiError;

/// Version segment inserted between the configured endpoint and the resource.
pub const API_VERSION_PATH: &str = "REST";

/// Query parameter carrying the pagination token on follow-up pages.
pub const PAGINATION_ID_PARAM: &str = "requestPaginationId";

/// Query parameter carrying the one-based page number on follow-up pages.
pub const PAGE_PARAM: &str = "requestPage";

/// Resource that exchanges credentials for a session cookie.
pub const LOGON_RESOURCE: &str = "Auth/Logon/";

/// Returns `true` for the logon resource, which is sent without a session
/// cookie and answers with one.
#[must_use]
pub fn is_logon_resource(resource: &str) -> bool {
    resource.contains("Auth/Logon")
}

/// Description of a single logical call against the REST API.
///
/// Descriptors are assembled with the `with_*` methods and are not modified
/// once handed to the client.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    resource: String,
    id: Option<String>,
    params: Vec<(String, String)>,
    body: Option<Value>,
}

impl RequestDescriptor {
    /// Starts a descriptor for `method` against `resource`.
    #[must_use]
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            id: None,
            params: Vec::new(),
            body: None,
        }
    }

    /// Sets the optional resource identifier appended to the path.
    #[must_use]
    pub fn with_id(mut self, id: Option<&str>) -> Self {
        self.id = id.map(str::to_owned);
        self
    }

    /// Appends query parameters, preserving their order.
    #[must_use]
    pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    /// Sets the JSON request body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// HTTP method of the call.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Resource path relative to the versioned endpoint.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Optional resource identifier.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// JSON request body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Returns a short `VERB resource` label used by tracers.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.resource)
    }

    /// Returns the descriptor for page `page` of a paginated result.
    #[must_use]
    pub(crate) fn for_page(&self, pagination_id: &str, page: u32) -> Self {
        self.clone().with_params([
            (PAGINATION_ID_PARAM, pagination_id.to_owned()),
            (PAGE_PARAM, page.to_string()),
        ])
    }

    /// Builds the target URL beneath `base_endpoint`.
    ///
    /// Trailing separators on the base, leading separators on the resource
    /// and the join with the identifier are normalised so exactly one `/`
    /// separates each segment.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when the base endpoint is blank or
    /// the assembled URL does not parse.
    pub fn endpoint(&self, base_endpoint: &str) -> Result<Url, ApiError> {
        let base = base_endpoint.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(ApiError::Configuration(String::from(
                "no endpoint configured for the Tier3 cloud",
            )));
        }

        let mut target = format!("{base}/{API_VERSION_PATH}/");
        target.push_str(self.resource.trim_start_matches('/'));
        if let Some(id) = &self.id {
            if !target.ends_with('/') {
                target.push('/');
            }
            target.push_str(id.trim_start_matches('/'));
        }
        if !self.params.is_empty() {
            let trimmed = target.trim_end_matches('/').len();
            target.truncate(trimmed);
        }

        let mut url = Url::parse(&target).map_err(|err| {
            ApiError::Configuration(format!("invalid endpoint `{target}`: {err}"))
        })?;
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(
                self.params
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }
        trace!(endpoint = %url, "built endpoint");
        Ok(url)
    }
}
