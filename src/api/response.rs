//! Single-assignment response handles with pagination chaining.
//!
//! A [`ResponseFuture`] is created before an exchange is dispatched and is
//! resolved exactly once by the task performing it, through its paired
//! resolver. Any number of readers may clone the handle and await its
//! accessors; all of them observe the same resolution. When the provider
//! reports an incomplete multi-page result the resolver links a successor
//! future, so readers walk pages strictly in request order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{trace, warn};

use super::error::ApiError;

/// Interval after which a parked reader wakes, logs, and parks again.
const READER_WAKE_INTERVAL: Duration = Duration::from_secs(60);

/// Status recorded for futures resolved as absent.
const NOT_FOUND: u16 = 404;

/// Payload of a resolved response.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    /// Parsed JSON document.
    Json(Value),
    /// Raw body delivered for non-JSON content types.
    Raw(Bytes),
    /// No body, for example after a 404 on GET.
    Empty,
}

/// Kind of payload carried by a resolved response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseKind {
    /// The body was parsed as JSON.
    Json,
    /// The body was delivered as raw bytes.
    Raw,
    /// There was no body.
    None,
}

/// Successful resolution of a single exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    /// HTTP status code.
    pub status: u16,
    /// Payload, if any.
    pub body: ResponseBody,
    /// `false` when more pages follow this one.
    pub complete: bool,
}

impl Resolved {
    /// Returns the JSON document, if the body was JSON.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the kind of payload carried.
    #[must_use]
    pub const fn kind(&self) -> ResponseKind {
        match self.body {
            ResponseBody::Json(_) => ResponseKind::Json,
            ResponseBody::Raw(_) => ResponseKind::Raw,
            ResponseBody::Empty => ResponseKind::None,
        }
    }
}

type Outcome = Result<Arc<Resolved>, ApiError>;

#[derive(Default)]
struct Slot {
    outcome: Option<Outcome>,
    next: Option<ResponseFuture>,
}

/// Handle on the eventual outcome of one HTTP exchange or one page of a
/// paginated GET.
#[derive(Clone)]
pub struct ResponseFuture {
    slot: Arc<watch::Sender<Slot>>,
}

impl fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.borrow();
        f.debug_struct("ResponseFuture")
            .field("outcome", &slot.outcome)
            .field("has_next", &slot.next.is_some())
            .finish()
    }
}

impl ResponseFuture {
    /// Creates a pending future together with the resolver that settles it.
    pub(crate) fn pending() -> (Self, Resolver) {
        let (sender, _receiver) = watch::channel(Slot::default());
        let future = Self {
            slot: Arc::new(sender),
        };
        let resolver = Resolver {
            target: future.clone(),
        };
        (future, resolver)
    }

    /// Creates a future already resolved with `resolved`.
    pub(crate) fn ready(resolved: Resolved) -> Self {
        let (future, resolver) = Self::pending();
        resolver.settle(Ok(Arc::new(resolved)));
        future
    }

    /// Creates a future already resolved as absent.
    pub(crate) fn absent(status: u16) -> Self {
        Self::ready(Resolved {
            status,
            body: ResponseBody::Empty,
            complete: true,
        })
    }

    /// Creates a future already resolved with `error`.
    pub(crate) fn failed(error: ApiError) -> Self {
        let (future, resolver) = Self::pending();
        resolver.settle(Err(error));
        future
    }

    /// Returns `true` once the future has been resolved, without waiting.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().outcome.is_some()
    }

    /// Waits for the resolution and returns it.
    ///
    /// # Errors
    ///
    /// Re-raises the terminal error the future was resolved with.
    pub async fn resolved(&self) -> Result<Arc<Resolved>, ApiError> {
        let mut receiver = self.slot.subscribe();
        loop {
            if let Some(outcome) = receiver.borrow_and_update().outcome.clone() {
                return outcome;
            }
            if timeout(READER_WAKE_INTERVAL, receiver.changed())
                .await
                .is_err()
            {
                trace!("still waiting for response resolution");
            }
        }
    }

    /// Waits for the resolution and returns the HTTP status code.
    ///
    /// # Errors
    ///
    /// Re-raises the terminal error the future was resolved with.
    pub async fn status(&self) -> Result<u16, ApiError> {
        Ok(self.resolved().await?.status)
    }

    /// Waits for the resolution and returns the JSON body, if any.
    ///
    /// # Errors
    ///
    /// Re-raises the terminal error the future was resolved with.
    pub async fn json(&self) -> Result<Option<Value>, ApiError> {
        Ok(self.resolved().await?.json().cloned())
    }

    /// Waits for the resolution and returns its payload.
    ///
    /// # Errors
    ///
    /// Re-raises the terminal error the future was resolved with.
    pub async fn body(&self) -> Result<ResponseBody, ApiError> {
        Ok(self.resolved().await?.body.clone())
    }

    /// Waits for the resolution and returns the raw body, if the content type
    /// was not JSON.
    ///
    /// # Errors
    ///
    /// Re-raises the terminal error the future was resolved with.
    pub async fn bytes(&self) -> Result<Option<Bytes>, ApiError> {
        let resolved = self.resolved().await?;
        Ok(match &resolved.body {
            ResponseBody::Raw(data) => Some(data.clone()),
            _ => None,
        })
    }

    /// Waits for the resolution and returns the payload kind.
    ///
    /// # Errors
    ///
    /// Re-raises the terminal error the future was resolved with.
    pub async fn kind(&self) -> Result<ResponseKind, ApiError> {
        Ok(self.resolved().await?.kind())
    }

    /// Waits for the resolution and reports whether it is the final page.
    ///
    /// # Errors
    ///
    /// Re-raises the terminal error the future was resolved with.
    pub async fn is_complete(&self) -> Result<bool, ApiError> {
        Ok(self.resolved().await?.complete)
    }

    /// Waits for the resolution and reports whether more pages follow.
    ///
    /// # Errors
    ///
    /// Re-raises the terminal error the future was resolved with.
    pub async fn has_more_pages(&self) -> Result<bool, ApiError> {
        Ok(!self.resolved().await?.complete)
    }

    /// Returns the future for the following page, or `None` when this page
    /// completes the result.
    ///
    /// Waits first for this page to resolve and then, for incomplete pages,
    /// until the successor has been attached.
    ///
    /// # Errors
    ///
    /// Re-raises the terminal error this page was resolved with.
    pub async fn next(&self) -> Result<Option<Self>, ApiError> {
        if self.resolved().await?.complete {
            return Ok(None);
        }
        let mut receiver = self.slot.subscribe();
        loop {
            if let Some(next) = receiver.borrow_and_update().next.clone() {
                return Ok(Some(next));
            }
            if timeout(READER_WAKE_INTERVAL, receiver.changed())
                .await
                .is_err()
            {
                trace!("still waiting for the next page to be attached");
            }
        }
    }

    /// Walks the `next` chain from this page and returns every resolved page
    /// in request order.
    ///
    /// # Errors
    ///
    /// Returns the first error found along the chain.
    pub async fn collect_pages(&self) -> Result<Vec<Arc<Resolved>>, ApiError> {
        let mut pages = vec![self.resolved().await?];
        let mut cursor = self.next().await?;
        while let Some(page) = cursor {
            pages.push(page.resolved().await?);
            cursor = page.next().await?;
        }
        Ok(pages)
    }

    /// Walks the chain and returns the JSON document of every page that
    /// carried one.
    ///
    /// # Errors
    ///
    /// Returns the first error found along the chain.
    pub async fn json_pages(&self) -> Result<Vec<Value>, ApiError> {
        Ok(self
            .collect_pages()
            .await?
            .iter()
            .filter_map(|page| page.json().cloned())
            .collect())
    }
}

/// Producer side of a [`ResponseFuture`].
///
/// Dropping a resolver that never settled its future resolves it with
/// [`ApiError::Abandoned`]; dropping one that settled an incomplete page
/// without linking a successor links an abandoned successor, so readers are
/// never parked forever.
pub(crate) struct Resolver {
    target: ResponseFuture,
}

impl Resolver {
    /// Resolves the future as absent with a 404 status.
    pub(crate) fn not_found(&self) -> bool {
        self.empty(NOT_FOUND)
    }

    /// Resolves the future as complete and without a body.
    pub(crate) fn empty(&self, status: u16) -> bool {
        self.settle(Ok(Arc::new(Resolved {
            status,
            body: ResponseBody::Empty,
            complete: true,
        })))
    }

    /// Resolves the future with a terminal error.
    pub(crate) fn fail(&self, error: ApiError) -> bool {
        self.settle(Err(error))
    }

    /// Resolves the future with a raw body.
    pub(crate) fn raw(&self, status: u16, data: Bytes) -> bool {
        self.settle(Ok(Arc::new(Resolved {
            status,
            body: ResponseBody::Raw(data),
            complete: true,
        })))
    }

    /// Resolves the future with a JSON body and its completeness.
    pub(crate) fn json(&self, status: u16, json: Value, complete: bool) -> bool {
        self.settle(Ok(Arc::new(Resolved {
            status,
            body: ResponseBody::Json(json),
            complete,
        })))
    }

    /// Links the future for the following page.
    ///
    /// Only incomplete pages accept a successor, and only once.
    pub(crate) fn link_next(&self, next: ResponseFuture) -> bool {
        let linked = self.target.slot.send_if_modified(|slot| {
            let incomplete = matches!(&slot.outcome, Some(Ok(resolved)) if !resolved.complete);
            if !incomplete || slot.next.is_some() {
                return false;
            }
            slot.next = Some(next);
            true
        });
        if !linked {
            warn!("ignored attempt to link a successor page");
        }
        linked
    }

    fn settle(&self, outcome: Outcome) -> bool {
        let mut candidate = Some(outcome);
        let settled = self.target.slot.send_if_modified(|slot| {
            if slot.outcome.is_some() {
                return false;
            }
            slot.outcome = candidate.take();
            true
        });
        if !settled {
            warn!("ignored second resolution of a response future");
        }
        settled
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        self.target.slot.send_if_modified(|slot| match &slot.outcome {
            None => {
                slot.outcome = Some(Err(ApiError::Abandoned));
                true
            }
            Some(Ok(resolved)) if !resolved.complete && slot.next.is_none() => {
                slot.next = Some(ResponseFuture::failed(ApiError::Abandoned));
                true
            }
            Some(_) => false,
        });
    }
}
