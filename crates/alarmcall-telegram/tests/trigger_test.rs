//! End-to-end: alert post -> eligible phones -> Zvonok requests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alarmcall_persistence::{CallWindowStore, Database, PhoneRegistry};
use alarmcall_telegram::{BotState, CallDispatcher, CallOutcome, CallTrigger, ContactOutcome};
use alarmcall_zvonok::{Endpoint, RetryPolicy, ZvonokClient, ZvonokConfig, ZvonokError};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockito::{Matcher, Server};
use serde_json::Value;

const ALERTS: i64 = -1002194118218;

fn client_for(server: &Server) -> ZvonokClient {
    let config = ZvonokConfig::new(Some("key".to_string()), "270119321", server.url())
        .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));
    ZvonokClient::new(config).unwrap()
}

#[tokio::test]
async fn test_failing_call_does_not_block_other_users() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", Endpoint::CreateCall.path())
        .match_body(Matcher::UrlEncoded("phone".into(), "+15550000001".into()))
        .with_status(503)
        .expect(3)
        .create_async()
        .await;
    let working = server
        .mock("POST", Endpoint::CreateCall.path())
        .match_body(Matcher::UrlEncoded("phone".into(), "+15550000002".into()))
        .with_status(200)
        .with_body(r#"{"status": "ok"}"#)
        .expect(1)
        .create_async()
        .await;

    let db = Database::open_in_memory().unwrap();
    let phones = PhoneRegistry::new(db.clone());
    let windows = CallWindowStore::new(db.clone());
    let t0 = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();

    phones.register(1, "+15550000001").unwrap();
    phones.register(2, "+15550000002").unwrap();
    windows.open_for_hours(1, t0, 2).unwrap();
    windows.open_for_hours(2, t0, 2).unwrap();

    let trigger = CallTrigger::new(windows, Arc::new(client_for(&server)), HashSet::from([ALERTS]));
    let report = trigger
        .on_channel_post(ALERTS, t0 + chrono::Duration::hours(1))
        .await
        .unwrap();

    assert!(report.dispatched);
    assert_eq!(report.succeeded, vec!["+15550000002".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "+15550000001");
    assert!(report.failed[0].1.contains("responded with code = 503"));

    failing.assert_async().await;
    working.assert_async().await;
}

#[tokio::test]
async fn test_expired_window_places_no_call() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Endpoint::CreateCall.path())
        .with_status(200)
        .with_body(r#"{"status": "ok"}"#)
        .expect(0)
        .create_async()
        .await;

    let db = Database::open_in_memory().unwrap();
    let t0 = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
    PhoneRegistry::new(db.clone()).register(42, "+15550000042").unwrap();
    let windows = CallWindowStore::new(db);
    windows.open_for_hours(42, t0, 2).unwrap();

    let trigger = CallTrigger::new(windows, Arc::new(client_for(&server)), HashSet::from([ALERTS]));
    let report = trigger
        .on_channel_post(ALERTS, t0 + chrono::Duration::hours(3))
        .await
        .unwrap();

    assert_eq!(report.attempted(), 0);
    mock.assert_async().await;
}

#[derive(Default)]
struct CountingDispatcher {
    calls: AtomicUsize,
}

#[async_trait]
impl CallDispatcher for CountingDispatcher {
    async fn create_call(&self, _phone: &str) -> Result<Value, ZvonokError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_handlers_share_one_database() {
    let db = Database::open_in_memory().unwrap();
    let dispatcher = Arc::new(CountingDispatcher::default());
    let trigger = CallTrigger::new(
        CallWindowStore::new(db.clone()),
        dispatcher.clone(),
        HashSet::from([ALERTS]),
    );
    let state = Arc::new(BotState::new(db, trigger, 24));
    let now = Utc::now();

    let mut tasks = Vec::new();
    for user_id in 1..=8i64 {
        let state = Arc::clone(&state);
        tasks.push(tokio::spawn(async move {
            let phone = format!("+1555000{:04}", user_id);
            assert_eq!(
                state.save_contact(user_id, Some(user_id), &phone).unwrap(),
                ContactOutcome::Saved
            );
            let outcome = state.open_call_window(user_id, "/call 1", now).unwrap();
            assert!(matches!(outcome, CallOutcome::Opened(_)));
            state.trigger().on_channel_post(ALERTS, now).await.unwrap()
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().dispatched);
    }

    let before = dispatcher.calls.load(Ordering::SeqCst);
    let report = state.trigger().on_channel_post(ALERTS, now).await.unwrap();

    assert_eq!(report.succeeded.len(), 8);
    assert_eq!(dispatcher.calls.load(Ordering::SeqCst), before + 8);
}
