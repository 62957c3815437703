//! Client for the Tier3 REST API.
//!
//! [`ApiClient`] translates logical calls into HTTP exchanges, attaches the
//! session cookie obtained from the logon resource, and classifies each
//! response into success, absence or error. GET calls return a
//! [`ResponseFuture`] immediately and run on a spawned task; DELETE, POST and
//! PUT are awaited by the caller.

mod error;
mod exchange;
mod pages;
mod request;
mod response;
pub mod session;
mod trace;
mod verbs;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::Tier3Config;
use crate::credentials::Credentials;
use session::{DEFAULT_SESSION_TTL, InMemorySessionCache, SessionCache, SessionKey};

pub use error::ApiError;
pub use request::{
    API_VERSION_PATH, LOGON_RESOURCE, PAGE_PARAM, PAGINATION_ID_PARAM, RequestDescriptor,
    is_logon_resource,
};
pub use response::{Resolved, ResponseBody, ResponseFuture, ResponseKind};
pub use trace::{CallCounter, RequestTracer, TraceOutcome, WireTracer};

/// HTTP 200.
pub const OK: u16 = 200;
/// HTTP 201.
pub const CREATED: u16 = 201;
/// HTTP 202.
pub const ACCEPTED: u16 = 202;
/// HTTP 204.
pub const NO_CONTENT: u16 = 204;
/// HTTP 404.
pub const NOT_FOUND: u16 = 404;

/// Response header carrying the pagination token of a multi-page result.
pub const PAGINATION_HEADER: &str = "x-es-pagination";
/// Response header set to `true` on the last page of a multi-page result.
pub const LAST_PAGE_HEADER: &str = "x-es-last-page";
/// Name of the cookie the logon resource hands back.
pub const SESSION_COOKIE_NAME: &str = "Tier3.API.Cookie";
/// Key under which a logon response exposes the captured cookie.
pub const SESSION_JSON_KEY: &str = "Cookie";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_MAX_CONCURRENT_GETS: usize = 16;
const USER_AGENT: &str = concat!("tier3/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
struct Context {
    endpoint: String,
    account: String,
    credentials: Credentials,
}

struct Inner {
    http: reqwest::Client,
    context: Context,
    sessions: Arc<dyn SessionCache>,
    session_ttl: Duration,
    tracers: Vec<Arc<dyn RequestTracer>>,
    workers: Arc<Semaphore>,
}

/// Client for the Tier3 REST API.
///
/// Cloning is cheap; clones share the transport, session cache, tracers and
/// GET worker budget.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.inner.context.endpoint)
            .field("account", &self.inner.context.account)
            .field("session_ttl", &self.inner.session_ttl)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Starts a builder for a client talking to `endpoint` on behalf of
    /// `account` with `credentials`.
    #[must_use]
    pub fn builder(
        endpoint: impl Into<String>,
        account: impl Into<String>,
        credentials: Credentials,
    ) -> ApiClientBuilder {
        ApiClientBuilder::new(endpoint.into(), account.into(), credentials)
    }

    /// Builds a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when the configuration is invalid,
    /// the secret cannot be resolved, or the transport cannot be built.
    pub fn from_config(config: &Tier3Config) -> Result<Self, ApiError> {
        let credentials = config.credentials()?;
        let mut builder = Self::builder(config.endpoint.trim(), config.account(), credentials)
            .session_ttl(config.session_ttl())
            .connect_timeout(config.connect_timeout())
            .request_timeout(config.request_timeout())
            .max_concurrent_gets(config.max_concurrent_gets);
        if let Some(host) = &config.proxy_host {
            builder = builder.proxy(host, config.proxy_port);
        }
        builder.build()
    }

    /// Returns a client using different credentials.
    ///
    /// The transport, session cache and tracers are shared, so the next
    /// authenticated call logs on exactly once for the new fingerprint.
    #[must_use]
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            inner: Arc::new(Inner {
                http: self.inner.http.clone(),
                context: Context {
                    credentials,
                    ..self.inner.context.clone()
                },
                sessions: Arc::clone(&self.inner.sessions),
                session_ttl: self.inner.session_ttl,
                tracers: self.inner.tracers.clone(),
                workers: Arc::clone(&self.inner.workers),
            }),
        }
    }

    /// Configured base endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.context.endpoint
    }

    /// Account alias calls are made for.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.inner.context.account
    }

    /// Returns the session cookie for the current credentials, logging on
    /// when no live session is cached for their fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the logon exchange fails or yields no
    /// session cookie.
    pub async fn logon(&self) -> Result<String, ApiError> {
        let context = &self.inner.context;
        let key = SessionKey::new(
            context.account.clone(),
            context.credentials.fingerprint(&context.account),
        );
        if let Some(token) = self.inner.sessions.get(&key) {
            return Ok(token);
        }

        debug!(account = %context.account, "establishing a new session");
        let request = RequestDescriptor::new(Method::POST, LOGON_RESOURCE).with_body(json!({
            "APIKey": context.credentials.api_key(),
            "Password": context.credentials.api_secret(),
        }));
        let target = request.endpoint(&context.endpoint)?;
        let response = self.logon_exchange(&request, &target).await?;
        let token = response
            .json()
            .await?
            .as_ref()
            .and_then(|document| document.get(SESSION_JSON_KEY))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                ApiError::Session(format!(
                    "logon response carried no {SESSION_COOKIE_NAME} cookie"
                ))
            })?;

        self.inner
            .sessions
            .put(key, token.clone(), self.inner.session_ttl);
        Ok(token)
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    context: Context,
    sessions: Option<Arc<dyn SessionCache>>,
    session_ttl: Duration,
    tracers: Vec<Arc<dyn RequestTracer>>,
    proxy: Option<(String, Option<u16>)>,
    connect_timeout: Duration,
    request_timeout: Duration,
    max_concurrent_gets: usize,
}

impl ApiClientBuilder {
    fn new(endpoint: String, account: String, credentials: Credentials) -> Self {
        Self {
            context: Context {
                endpoint,
                account,
                credentials,
            },
            sessions: None,
            session_ttl: DEFAULT_SESSION_TTL,
            tracers: vec![Arc::new(WireTracer)],
            proxy: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrent_gets: DEFAULT_MAX_CONCURRENT_GETS,
        }
    }

    /// Injects the session cache; defaults to a fresh in-memory cache.
    #[must_use]
    pub fn session_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.sessions = Some(cache);
        self
    }

    /// Sets how long an established session is reused.
    #[must_use]
    pub const fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Adds a tracer observing every exchange.
    #[must_use]
    pub fn tracer(mut self, tracer: Arc<dyn RequestTracer>) -> Self {
        self.tracers.push(tracer);
        self
    }

    /// Routes requests through an HTTP proxy.
    #[must_use]
    pub fn proxy(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.proxy = Some((host.into(), port));
        self
    }

    /// Sets the connection establishment timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the whole-exchange timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Bounds the number of GET exchanges running at once.
    #[must_use]
    pub const fn max_concurrent_gets(mut self, limit: usize) -> Self {
        self.max_concurrent_gets = limit;
        self
    }

    /// Validates the endpoint and builds the client.
    ///
    /// Idle connections are never kept, so every exchange opens and tears
    /// down its own connection.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when the endpoint is blank or
    /// malformed, the proxy is invalid, or the transport cannot be built.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        RequestDescriptor::new(Method::GET, "").endpoint(&self.context.endpoint)?;
        if self.max_concurrent_gets == 0 {
            return Err(ApiError::Configuration(String::from(
                "max_concurrent_gets must be at least 1",
            )));
        }

        let mut transport = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .pool_max_idle_per_host(0)
            // only the configured proxy applies, never one from the environment
            .no_proxy();
        if let Some((host, port)) = &self.proxy {
            let proxy_url = port.map_or_else(
                || format!("http://{host}"),
                |value| format!("http://{host}:{value}"),
            );
            let proxy = reqwest::Proxy::all(&proxy_url).map_err(|err| {
                ApiError::Configuration(format!("invalid proxy `{proxy_url}`: {err}"))
            })?;
            transport = transport.proxy(proxy);
        }
        let http = transport
            .build()
            .map_err(|err| ApiError::Configuration(format!("failed to build transport: {err}")))?;

        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                context: self.context,
                sessions: self
                    .sessions
                    .unwrap_or_else(|| Arc::new(InMemorySessionCache::new())),
                session_ttl: self.session_ttl,
                tracers: self.tracers,
                workers: Arc::new(Semaphore::new(self.max_concurrent_gets)),
            }),
        })
    }
}

#[cfg(test)]
mod tests;
