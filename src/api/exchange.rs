//! The single routine every HTTP exchange passes through.

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, SET_COOKIE};
use reqwest::Url;
use serde_json::{Value, json};
use tracing::{debug, error};

use super::request::RequestDescriptor;
use super::response::{Resolved, ResponseBody, ResponseFuture};
use super::trace::TraceOutcome;
use super::{ApiClient, ApiError, NOT_FOUND, OK, SESSION_COOKIE_NAME, SESSION_JSON_KEY};

const JSON_MEDIA_TYPE: &str = "application/json";

/// Fully buffered HTTP response.
pub(super) struct RawResponse {
    pub(super) status: u16,
    pub(super) reason: String,
    pub(super) headers: HeaderMap,
    pub(super) body: Bytes,
}

impl RawResponse {
    /// Missing content types are treated as JSON, as the provider omits the
    /// header on some error-free responses.
    pub(super) fn is_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_none_or(|value| value.to_ascii_lowercase().contains("json"))
    }

    /// Returns the value of `name` as text, if present and printable.
    pub(super) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    }

    /// Converts an unexpected status into [`ApiError::Api`], logging it.
    pub(super) fn to_api_error(&self, request: &RequestDescriptor) -> ApiError {
        let body = String::from_utf8_lossy(&self.body).into_owned();
        error!(
            call = %request.label(),
            status = self.status,
            reason = %self.reason,
            "provider returned an unexpected status"
        );
        ApiError::Api {
            status: self.status,
            reason: self.reason.clone(),
            body,
        }
    }

    /// Parses the body as JSON. An empty body is malformed, not absent.
    pub(super) fn parse_json(&self) -> Result<Value, ApiError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Builds an already-resolved future from a successful response.
    ///
    /// Non-JSON content types are delivered raw.
    pub(super) fn into_future(self) -> Result<ResponseFuture, ApiError> {
        let body = if self.is_json() {
            ResponseBody::Json(self.parse_json()?)
        } else {
            ResponseBody::Raw(self.body.clone())
        };
        Ok(ResponseFuture::ready(Resolved {
            status: self.status,
            body,
            complete: true,
        }))
    }
}

impl ApiClient {
    /// Performs one exchange, calling every tracer before and after.
    pub(super) async fn exchange(
        &self,
        request: &RequestDescriptor,
        target: &Url,
        cookie: Option<&str>,
    ) -> Result<RawResponse, ApiError> {
        for tracer in &self.inner.tracers {
            tracer.before(request, target);
        }

        let mut builder = self
            .inner
            .http
            .request(request.method().clone(), target.clone())
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE);
        if let Some(value) = cookie {
            builder = builder.header(COOKIE, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_string());
        }

        match Self::send(builder).await {
            Ok(raw) => {
                let outcome = TraceOutcome::Response {
                    status: raw.status,
                    headers: &raw.headers,
                    body: &raw.body,
                };
                for tracer in &self.inner.tracers {
                    tracer.after(request, target, &outcome);
                }
                debug!(call = %request.label(), status = raw.status, "exchange completed");
                Ok(raw)
            }
            Err(err) => {
                let message = err.to_string();
                let outcome = TraceOutcome::Failed { message: &message };
                for tracer in &self.inner.tracers {
                    tracer.after(request, target, &outcome);
                }
                error!(call = %request.label(), error = %message, "exchange failed");
                Err(err)
            }
        }
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<RawResponse, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            body,
        })
    }

    /// Posts credentials to the logon resource and captures the session
    /// cookie as `{"Cookie": "<name=value>"}`.
    pub(super) async fn logon_exchange(
        &self,
        request: &RequestDescriptor,
        target: &Url,
    ) -> Result<ResponseFuture, ApiError> {
        let raw = self.exchange(request, target, None).await?;
        if raw.status == NOT_FOUND {
            return Err(ApiError::NotFound {
                target: target.to_string(),
            });
        }
        if raw.status != OK {
            return Err(raw.to_api_error(request));
        }

        let cookie = raw
            .headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::trim)
            .find(|value| value.starts_with(SESSION_COOKIE_NAME))
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .ok_or_else(|| {
                ApiError::Session(format!(
                    "logon returned {} without a {SESSION_COOKIE_NAME} cookie",
                    raw.status
                ))
            })?;

        Ok(ResponseFuture::ready(Resolved {
            status: raw.status,
            body: ResponseBody::Json(json!({ SESSION_JSON_KEY: cookie })),
            complete: true,
        }))
    }
}
