//! Tests for response futures and their resolvers.

use std::time::Duration;

use bytes::Bytes;
use serde_json::json;
use tokio::time::timeout;

use crate::api::{ApiError, ResponseBody, ResponseFuture, ResponseKind};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn every_reader_observes_the_single_resolution() {
    let (future, resolver) = ResponseFuture::pending();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let reader = future.clone();
            tokio::spawn(async move { reader.json().await })
        })
        .collect();

    assert!(!future.is_resolved());
    assert!(resolver.json(200, json!({"Success": true}), true));

    for reader in readers {
        let document = timeout(WAIT, reader)
            .await
            .unwrap_or_else(|err| panic!("reader timed out: {err}"))
            .unwrap_or_else(|err| panic!("reader panicked: {err}"))
            .unwrap_or_else(|err| panic!("reader failed: {err}"));
        assert_eq!(document, Some(json!({"Success": true})));
    }
}

#[tokio::test]
async fn second_resolution_is_ignored() {
    let (future, resolver) = ResponseFuture::pending();
    assert!(resolver.json(201, json!({"RequestID": 7}), true));
    assert!(!resolver.fail(ApiError::Abandoned));
    assert!(!resolver.not_found());

    assert_eq!(future.status().await, Ok(201));
    assert_eq!(future.json().await, Ok(Some(json!({"RequestID": 7}))));
}

#[tokio::test]
async fn error_is_reraised_to_every_reader() {
    let (future, resolver) = ResponseFuture::pending();
    let error = ApiError::Transport {
        message: String::from("connection refused"),
    };
    resolver.fail(error.clone());

    assert_eq!(future.status().await, Err(error.clone()));
    assert_eq!(future.clone().json().await, Err(error));
}

#[tokio::test]
async fn not_found_resolves_complete_without_body() {
    let (future, resolver) = ResponseFuture::pending();
    resolver.not_found();

    assert_eq!(future.status().await, Ok(404));
    assert_eq!(future.json().await, Ok(None));
    assert_eq!(future.kind().await, Ok(ResponseKind::None));
    assert_eq!(future.is_complete().await, Ok(true));
    assert!(future.next().await.is_ok_and(|next| next.is_none()));
}

#[tokio::test]
async fn raw_body_is_delivered_as_bytes() {
    let (future, resolver) = ResponseFuture::pending();
    resolver.raw(200, Bytes::from_static(b"plain text"));

    assert_eq!(future.kind().await, Ok(ResponseKind::Raw));
    assert_eq!(future.bytes().await, Ok(Some(Bytes::from_static(b"plain text"))));
    assert_eq!(future.json().await, Ok(None));
    assert_eq!(
        future.body().await,
        Ok(ResponseBody::Raw(Bytes::from_static(b"plain text")))
    );
}

#[tokio::test]
async fn dropped_resolver_abandons_pending_future() {
    let (future, resolver) = ResponseFuture::pending();
    let reader = {
        let handle = future.clone();
        tokio::spawn(async move { handle.status().await })
    };
    drop(resolver);

    let outcome = timeout(WAIT, reader)
        .await
        .unwrap_or_else(|err| panic!("reader timed out: {err}"))
        .unwrap_or_else(|err| panic!("reader panicked: {err}"));
    assert_eq!(outcome, Err(ApiError::Abandoned));
}

#[tokio::test]
async fn dropped_resolver_abandons_missing_successor() {
    let (future, resolver) = ResponseFuture::pending();
    resolver.json(200, json!({"Page": 1}), false);
    drop(resolver);

    let next = future
        .next()
        .await
        .unwrap_or_else(|err| panic!("next: {err}"))
        .unwrap_or_else(|| panic!("incomplete page should have a successor"));
    assert_eq!(next.status().await, Err(ApiError::Abandoned));
}

#[tokio::test]
async fn successor_only_links_onto_incomplete_pages() {
    let (complete, resolver) = ResponseFuture::pending();
    resolver.json(200, json!([]), true);
    assert!(!resolver.link_next(ResponseFuture::absent(404)));
    assert!(complete.next().await.is_ok_and(|next| next.is_none()));

    let (incomplete, pager) = ResponseFuture::pending();
    pager.json(200, json!([1]), false);
    assert!(pager.link_next(ResponseFuture::absent(404)));
    assert!(!pager.link_next(ResponseFuture::absent(404)));
    assert!(incomplete.has_more_pages().await.is_ok_and(|more| more));
}

#[tokio::test]
async fn chain_is_walked_in_request_order() {
    let (first, first_resolver) = ResponseFuture::pending();
    let producer = tokio::spawn(async move {
        first_resolver.json(200, json!({"Page": 1}), false);
        let (second, second_resolver) = ResponseFuture::pending();
        first_resolver.link_next(second);
        tokio::time::sleep(Duration::from_millis(20)).await;
        second_resolver.json(200, json!({"Page": 2}), false);
        let (third, third_resolver) = ResponseFuture::pending();
        second_resolver.link_next(third);
        third_resolver.json(200, json!({"Page": 3}), true);
    });

    let pages = timeout(WAIT, first.json_pages())
        .await
        .unwrap_or_else(|err| panic!("chain timed out: {err}"))
        .unwrap_or_else(|err| panic!("chain failed: {err}"));
    producer
        .await
        .unwrap_or_else(|err| panic!("producer panicked: {err}"));

    assert_eq!(
        pages,
        vec![json!({"Page": 1}), json!({"Page": 2}), json!({"Page": 3})]
    );
}
