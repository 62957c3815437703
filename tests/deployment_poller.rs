//! Deployment-status polling and account checks against a mock HTTP server.

use std::time::Duration;

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

use tier3::deployment::{DEPLOYMENT_STATUS_RESOURCE, query_status, request_id};
use tier3::test_support::session_set_cookie;
use tier3::{ApiClient, ApiError, Credentials, DeploymentPoller, OperationKind, check_context};

fn client_for(server: &ServerGuard, account: &str) -> ApiClient {
    ApiClient::builder(server.url(), account, Credentials::new("key", "secret"))
        .build()
        .unwrap_or_else(|err| panic!("build client: {err}"))
}

async fn with_logon(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/REST/Auth/Logon/")
        .with_status(200)
        .with_header("set-cookie", &session_set_cookie("deploy"))
        .create_async()
        .await
}

fn status_path() -> String {
    format!("/REST/{DEPLOYMENT_STATUS_RESOURCE}")
}

#[tokio::test]
async fn query_status_reads_progress() {
    let mut server = Server::new_async().await;
    let _logon = with_logon(&mut server).await;
    let _status = server
        .mock("POST", status_path().as_str())
        .match_body(Matcher::Json(json!({"RequestId": 77})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "RequestID": 77,
                "Success": true,
                "PercentComplete": 40,
                "CurrentStatus": "Executing",
                "Servers": null
            })
            .to_string(),
        )
        .create_async()
        .await;
    let client = client_for(&server, "ACME");

    let status = query_status(&client, 77)
        .await
        .unwrap_or_else(|err| panic!("query status: {err}"));

    assert_eq!(status.request_id, Some(77));
    assert_eq!(status.percent_complete, Some(40.0));
    assert_eq!(status.current_status.as_deref(), Some("Executing"));
    assert!(status.first_resource().is_none());
}

#[tokio::test]
async fn query_status_surfaces_failed_requests() {
    let mut server = Server::new_async().await;
    let _logon = with_logon(&mut server).await;
    let _status = server
        .mock("POST", status_path().as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"RequestID":78,"Success":false,"Message":"Quota exceeded"}"#)
        .create_async()
        .await;
    let client = client_for(&server, "ACME");

    let err = query_status(&client, 78)
        .await
        .expect_err("failed request should raise");

    assert_eq!(
        err,
        ApiError::DeploymentFailed {
            request_id: 78,
            message: String::from("Quota exceeded"),
        }
    );
}

#[tokio::test]
async fn poller_returns_resource_once_reported() {
    let mut server = Server::new_async().await;
    let _logon = with_logon(&mut server).await;
    let status = server
        .mock("POST", status_path().as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"RequestID":79,"Success":true,"Servers":["WA1ACMEWEB01"]}"#)
        .expect(1)
        .create_async()
        .await;
    let poller = DeploymentPoller::new(client_for(&server, "ACME"), OperationKind::Provision)
        .with_poll_interval(Duration::from_millis(10));

    let resource = poller
        .wait_for_resource(79)
        .await
        .unwrap_or_else(|err| panic!("wait: {err}"));

    assert_eq!(resource.as_deref(), Some("WA1ACMEWEB01"));
    status.assert_async().await;
}

#[tokio::test]
async fn request_id_is_read_from_create_response() {
    let mut server = Server::new_async().await;
    let _logon = with_logon(&mut server).await;
    let _create = server
        .mock("POST", "/REST/Server/CreateServer/JSON")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"RequestID":80,"Success":true,"Message":"Queued"}"#)
        .create_async()
        .await;
    let client = client_for(&server, "ACME");

    let response = client
        .post("Server/CreateServer/JSON", &json!({"Alias": "WEB"}))
        .await
        .unwrap_or_else(|err| panic!("post: {err}"));
    let document = response
        .json()
        .await
        .unwrap_or_else(|err| panic!("json: {err}"))
        .unwrap_or_else(|| panic!("document expected"));

    assert_eq!(request_id(&document), Ok(80));
}

#[tokio::test]
async fn check_context_returns_reported_alias() {
    let mut server = Server::new_async().await;
    let _logon = with_logon(&mut server).await;
    let _details = server
        .mock("POST", "/REST/Account/GetAccountDetails/JSON")
        .match_body(Matcher::Json(json!({"AccountAlias": "ACME"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"Success":true,"AccountDetails":{"AccountAlias":"ACME"}}"#)
        .create_async()
        .await;
    let client = client_for(&server, "ACME");

    assert_eq!(check_context(&client).await.as_deref(), Some("ACME"));
}

#[tokio::test]
async fn check_context_swallows_rejections() {
    let mut server = Server::new_async().await;
    let _logon = with_logon(&mut server).await;
    let _details = server
        .mock("POST", "/REST/Account/GetAccountDetails/JSON")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"Success":false,"Message":"Access denied"}"#)
        .create_async()
        .await;
    let client = client_for(&server, "ACME");

    assert_eq!(check_context(&client).await, None);
}

#[tokio::test]
async fn check_context_rejects_long_alias_without_calling() {
    let mut server = Server::new_async().await;
    let logon = server
        .mock("POST", "/REST/Auth/Logon/")
        .expect(0)
        .create_async()
        .await;
    let client = client_for(&server, "TOOLONG");

    assert_eq!(check_context(&client).await, None);
    logon.assert_async().await;
}
