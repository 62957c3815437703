//! DELETE, POST and PUT calls, awaited by the caller.

use reqwest::Method;
use serde_json::Value;

use super::request::{RequestDescriptor, is_logon_resource};
use super::response::ResponseFuture;
use super::{ACCEPTED, ApiClient, ApiError, CREATED, NO_CONTENT, NOT_FOUND, OK};

impl ApiClient {
    /// Issues a DELETE.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] on 404, [`ApiError::Api`] for any status
    /// other than 204, and [`ApiError::Transport`] when the exchange fails.
    pub async fn delete<K, V>(
        &self,
        resource: &str,
        id: Option<&str>,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), ApiError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let request = RequestDescriptor::new(Method::DELETE, resource)
            .with_id(id)
            .with_params(params);
        let target = request.endpoint(&self.inner.context.endpoint)?;
        let cookie = self.logon().await?;
        let raw = self.exchange(&request, &target, Some(&cookie)).await?;
        match raw.status {
            NO_CONTENT => Ok(()),
            NOT_FOUND => Err(ApiError::NotFound {
                target: target.to_string(),
            }),
            _ => Err(raw.to_api_error(&request)),
        }
    }

    /// Issues a POST with a JSON body.
    ///
    /// Posting to the logon resource sends no session cookie and resolves to
    /// `{"Cookie": "<name=value>"}` captured from `Set-Cookie`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] on 404, [`ApiError::Api`] for statuses
    /// other than 200, 201 and 202, [`ApiError::Parse`] for a malformed JSON
    /// body, and [`ApiError::Transport`] when the exchange fails.
    pub async fn post(&self, resource: &str, body: &Value) -> Result<ResponseFuture, ApiError> {
        let request = RequestDescriptor::new(Method::POST, resource).with_body(body.clone());
        let target = request.endpoint(&self.inner.context.endpoint)?;
        if is_logon_resource(resource) {
            return self.logon_exchange(&request, &target).await;
        }

        let cookie = self.logon().await?;
        let raw = self.exchange(&request, &target, Some(&cookie)).await?;
        match raw.status {
            OK | CREATED | ACCEPTED => raw.into_future(),
            NOT_FOUND => Err(ApiError::NotFound {
                target: target.to_string(),
            }),
            _ => Err(raw.to_api_error(&request)),
        }
    }

    /// Issues a PUT with a JSON body.
    ///
    /// A 404 or 204 resolves as absent rather than failing.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] for statuses other than 200, 201, 202, 204
    /// and 404, [`ApiError::Parse`] for a malformed JSON body, and
    /// [`ApiError::Transport`] when the exchange fails.
    pub async fn put(
        &self,
        resource: &str,
        id: Option<&str>,
        body: &Value,
    ) -> Result<ResponseFuture, ApiError> {
        let request = RequestDescriptor::new(Method::PUT, resource)
            .with_id(id)
            .with_body(body.clone());
        let target = request.endpoint(&self.inner.context.endpoint)?;
        if is_logon_resource(resource) {
            return self.logon_exchange(&request, &target).await;
        }

        let cookie = self.logon().await?;
        let raw = self.exchange(&request, &target, Some(&cookie)).await?;
        match raw.status {
            OK | CREATED | ACCEPTED => raw.into_future(),
            NOT_FOUND | NO_CONTENT => Ok(ResponseFuture::absent(raw.status)),
            _ => Err(raw.to_api_error(&request)),
        }
    }
}
