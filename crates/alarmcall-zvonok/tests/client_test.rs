//! HTTP behaviour of the Zvonok client against a mock provider.

use std::time::Duration;

use alarmcall_zvonok::{Endpoint, RetryPolicy, ZvonokClient, ZvonokConfig, ZvonokError};
use mockito::{Matcher, Server};

const TOKEN: &str = "test-public-key";
const CAMPAIGN: &str = "270119321";
const PHONE: &str = "+11111111111";

fn client_for(server: &Server) -> ZvonokClient {
    let config = ZvonokConfig::new(Some(TOKEN.to_string()), CAMPAIGN, server.url())
        .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));
    ZvonokClient::new(config).unwrap()
}

fn form_fields() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("public_key".into(), TOKEN.into()),
        Matcher::UrlEncoded("phone".into(), PHONE.into()),
        Matcher::UrlEncoded("campaign_id".into(), CAMPAIGN.into()),
    ])
}

#[tokio::test]
async fn test_create_call_posts_form() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Endpoint::CreateCall.path())
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(form_fields())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "ok", "data": {"call_id": 17}}"#)
        .expect(1)
        .create_async()
        .await;

    let body = client_for(&server).create_call(PHONE).await.unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["data"]["call_id"], 17);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_and_check_use_their_paths() {
    let mut server = Server::new_async().await;
    let delete = server
        .mock("POST", Endpoint::DeleteCall.path())
        .match_body(form_fields())
        .with_status(200)
        .with_body(r#"{"status": "ok"}"#)
        .expect(1)
        .create_async()
        .await;
    let check = server
        .mock("POST", Endpoint::CheckCall.path())
        .match_body(form_fields())
        .with_status(200)
        .with_body(r#"{"status": "ok", "data": [{"status": "answered"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    client.delete_call(PHONE).await.unwrap();
    let status = client.check_call(PHONE).await.unwrap();

    assert_eq!(status["data"][0]["status"], "answered");
    delete.assert_async().await;
    check.assert_async().await;
}

#[tokio::test]
async fn test_server_error_retried_until_exhausted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Endpoint::CreateCall.path())
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let err = client_for(&server).create_call(PHONE).await.unwrap_err();

    assert!(matches!(err, ZvonokError::Api(_)));
    let message = err.to_string();
    assert!(message.contains("responded with code = 500"), "{}", message);
    assert!(message.contains(Endpoint::CreateCall.path()), "{}", message);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_too_many_requests_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Endpoint::CreateCall.path())
        .with_status(429)
        .expect(3)
        .create_async()
        .await;

    assert!(client_for(&server).create_call(PHONE).await.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let mut server = Server::new_async().await;
    let unavailable = server
        .mock("POST", Endpoint::CreateCall.path())
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("POST", Endpoint::CreateCall.path())
        .with_status(200)
        .with_body(r#"{"status": "ok"}"#)
        .expect(1)
        .create_async()
        .await;

    let body = client_for(&server).create_call(PHONE).await.unwrap();

    assert_eq!(body["status"], "ok");
    unavailable.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Endpoint::CreateCall.path())
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let err = client_for(&server).create_call(PHONE).await.unwrap_err();

    assert!(err.to_string().contains("responded with code = 404"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_in_body_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Endpoint::CreateCall.path())
        .with_status(200)
        .with_body(r#"{"status": "error", "data": "campaign not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = client_for(&server).create_call(PHONE).await.unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Zvonok api responded with error"), "{}", message);
    assert!(message.contains("campaign not found"), "{}", message);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unparseable_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", Endpoint::CheckCall.path())
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let err = client_for(&server).check_call(PHONE).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to parse json from Zvonok api response");
}

#[tokio::test]
async fn test_single_attempt_policy() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Endpoint::CreateCall.path())
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let config = ZvonokConfig::new(Some(TOKEN.to_string()), CAMPAIGN, server.url())
        .with_retry(RetryPolicy::new(1, Duration::from_millis(1)));
    let client = ZvonokClient::new(config).unwrap();

    assert!(client.create_call(PHONE).await.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_provider_is_api_error() {
    // Nothing listens on port 9 locally; connection is refused.
    let config = ZvonokConfig::new(Some(TOKEN.to_string()), CAMPAIGN, "http://127.0.0.1:9")
        .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));
    let client = ZvonokClient::new(config).unwrap();

    let err = client.create_call(PHONE).await.unwrap_err();

    assert!(matches!(err, ZvonokError::Api(_)));
    assert!(err.to_string().contains("failed"));
}
