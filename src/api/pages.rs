//! GET calls and server-declared pagination.

use reqwest::Method;
use tokio::runtime::Handle;
use tracing::{Instrument, debug, info_span};

use super::exchange::RawResponse;
use super::request::RequestDescriptor;
use super::response::{ResponseFuture, Resolver};
use super::{ApiClient, ApiError, LAST_PAGE_HEADER, NOT_FOUND, OK, PAGINATION_HEADER};

/// Number of the first follow-up page.
const FIRST_FOLLOW_UP_PAGE: u32 = 2;

impl ApiClient {
    /// Issues a GET and returns its future immediately.
    ///
    /// The exchange runs on a spawned task once a worker slot is free.
    /// `operation` names the logical call in logs. A 404 resolves the future
    /// as absent; JSON bodies are parsed and other content types delivered
    /// raw. When the provider declares more pages, a successor future is
    /// linked as `next` and the following page is fetched on the same task.
    ///
    /// Called outside a tokio runtime, the returned future resolves to
    /// [`ApiError::Configuration`].
    #[must_use]
    pub fn get<K, V>(
        &self,
        operation: &str,
        resource: &str,
        id: Option<&str>,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> ResponseFuture
    where
        K: Into<String>,
        V: Into<String>,
    {
        let request = RequestDescriptor::new(Method::GET, resource)
            .with_id(id)
            .with_params(params);
        self.get_request(operation, request)
    }

    /// Issues a prepared GET descriptor. See [`ApiClient::get`].
    #[must_use]
    pub fn get_request(&self, operation: &str, request: RequestDescriptor) -> ResponseFuture {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                return ResponseFuture::failed(ApiError::Configuration(format!(
                    "GET {} issued outside a tokio runtime: {err}",
                    request.resource()
                )));
            }
        };

        let (future, resolver) = ResponseFuture::pending();
        let client = self.clone();
        let span = info_span!("get", operation, resource = request.resource());
        runtime.spawn(
            async move {
                client.fetch_pages(&request, resolver).await;
            }
            .instrument(span),
        );
        future
    }

    async fn fetch_pages(&self, request: &RequestDescriptor, first: Resolver) {
        let mut resolver = first;
        let mut current = request.clone();
        let mut page = FIRST_FOLLOW_UP_PAGE;
        while let Some(pagination_id) = self.fetch_page(&current, &resolver).await {
            debug!(page, "fetching next page");
            let (next, next_resolver) = ResponseFuture::pending();
            resolver.link_next(next);
            resolver = next_resolver;
            current = request.for_page(&pagination_id, page);
            page = page.saturating_add(1);
        }
    }

    /// Fetches one page into `resolver` and returns the pagination token
    /// when another page follows.
    async fn fetch_page(&self, request: &RequestDescriptor, resolver: &Resolver) -> Option<String> {
        match self.fetch_raw(request).await {
            Ok(raw) => Self::resolve_page(request, &raw, resolver),
            Err(err) => {
                resolver.fail(err);
                None
            }
        }
    }

    async fn fetch_raw(&self, request: &RequestDescriptor) -> Result<RawResponse, ApiError> {
        let _permit = self.inner.workers.acquire().await.map_err(|_| {
            ApiError::Configuration(String::from("GET worker pool has been closed"))
        })?;
        let target = request.endpoint(&self.inner.context.endpoint)?;
        let cookie = self.logon().await?;
        self.exchange(request, &target, Some(&cookie)).await
    }

    fn resolve_page(
        request: &RequestDescriptor,
        raw: &RawResponse,
        resolver: &Resolver,
    ) -> Option<String> {
        if raw.status == NOT_FOUND {
            resolver.not_found();
            return None;
        }
        if raw.status != OK {
            resolver.fail(raw.to_api_error(request));
            return None;
        }
        if !raw.is_json() {
            resolver.raw(raw.status, raw.body.clone());
            return None;
        }

        let document = match raw.parse_json() {
            Ok(document) => document,
            Err(err) => {
                resolver.fail(err);
                return None;
            }
        };
        let last_page = raw
            .header(LAST_PAGE_HEADER)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        let pagination_id = raw
            .header(PAGINATION_HEADER)
            .filter(|value| !value.is_empty() && !last_page)
            .map(str::to_owned);
        resolver.json(raw.status, document, pagination_id.is_none());
        pagination_id
    }
}
