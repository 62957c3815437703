//! Request tracing hooks applied at the client boundary.
//!
//! Every exchange, whatever its verb, passes through a single routine that
//! calls [`RequestTracer::before`] once the target URL is known and
//! [`RequestTracer::after`] once the full response has been buffered or the
//! transport failed.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use reqwest::Url;
use reqwest::header::HeaderMap;
use tracing::debug;

use super::request::{RequestDescriptor, is_logon_resource};

/// Result of an exchange as seen by tracers.
#[derive(Debug)]
pub enum TraceOutcome<'a> {
    /// The provider answered.
    Response {
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: &'a HeaderMap,
        /// Buffered body.
        body: &'a [u8],
    },
    /// The transport failed before a response was read.
    Failed {
        /// Transport error message.
        message: &'a str,
    },
}

/// Before/after hooks observing every exchange the client performs.
pub trait RequestTracer: Send + Sync {
    /// Called before the request is sent.
    fn before(&self, request: &RequestDescriptor, target: &Url);

    /// Called after the response was read or the transport failed.
    fn after(&self, request: &RequestDescriptor, target: &Url, outcome: &TraceOutcome<'_>);
}

/// Logs request and response lines on the `tier3::wire` target.
///
/// Cookie values and logon payloads are never logged.
#[derive(Clone, Copy, Debug, Default)]
pub struct WireTracer;

impl RequestTracer for WireTracer {
    fn before(&self, request: &RequestDescriptor, target: &Url) {
        // logon bodies carry the API secret
        let body = if is_logon_resource(request.resource()) {
            None
        } else {
            request.body()
        };
        debug!(
            target: "tier3::wire",
            method = %request.method(),
            url = %target,
            body = ?body,
            ">>> request"
        );
    }

    fn after(&self, request: &RequestDescriptor, target: &Url, outcome: &TraceOutcome<'_>) {
        match outcome {
            TraceOutcome::Response {
                status,
                headers,
                body,
            } => {
                let header_lines: Vec<String> = headers
                    .iter()
                    .filter(|(name, _)| name.as_str() != "set-cookie")
                    .map(|(name, value)| {
                        format!("{name}: {}", value.to_str().unwrap_or("<binary>").trim())
                    })
                    .collect();
                debug!(
                    target: "tier3::wire",
                    method = %request.method(),
                    url = %target,
                    status,
                    headers = ?header_lines,
                    body = %String::from_utf8_lossy(body),
                    "<<< response"
                );
            }
            TraceOutcome::Failed { message } => {
                debug!(
                    target: "tier3::wire",
                    method = %request.method(),
                    url = %target,
                    error = %message,
                    "<<< transport failure"
                );
            }
        }
    }
}

/// Counts calls per `VERB resource` label.
#[derive(Debug, Default)]
pub struct CallCounter {
    calls: Mutex<BTreeMap<String, usize>>,
}

impl CallCounter {
    /// Creates a counter with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls recorded for `label` (for example `POST Auth/Logon/`).
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(label)
            .copied()
            .unwrap_or(0)
    }

    /// Total number of calls recorded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Snapshot of every label and its count.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, usize> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RequestTracer for CallCounter {
    fn before(&self, request: &RequestDescriptor, _target: &Url) {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(request.label())
            .or_insert(0) += 1;
    }

    fn after(&self, _request: &RequestDescriptor, _target: &Url, _outcome: &TraceOutcome<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    #[test]
    fn call_counter_counts_per_label() {
        let counter = CallCounter::new();
        let target = Url::parse("https://api.example.test/REST/Auth/Logon/")
            .unwrap_or_else(|err| panic!("parse url: {err}"));
        let logon = RequestDescriptor::new(Method::POST, "Auth/Logon/");
        let server = RequestDescriptor::new(Method::GET, "Server/GetServer/JSON");

        counter.before(&logon, &target);
        counter.before(&server, &target);
        counter.before(&server, &target);

        assert_eq!(counter.count("POST Auth/Logon/"), 1);
        assert_eq!(counter.count("GET Server/GetServer/JSON"), 2);
        assert_eq!(counter.count("DELETE Server/GetServer/JSON"), 0);
        assert_eq!(counter.total(), 3);
    }
}
