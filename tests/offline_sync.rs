//! Delivery guarantees of the sync queue and the reconciliation flow

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;

use common::{StubServer, init_logging};
use wildlife_offline::client::CachedWildlifeClient;
use wildlife_offline::client::models::QuizResult;
use wildlife_offline::config::OfflineConfig;
use wildlife_offline::gateway::{Gateway, ResponseCache};
use wildlife_offline::net::Connectivity;
use wildlife_offline::outbox::{DeliveryConfig, DeliveryMethod, SyncQueue};
use wildlife_offline::store::OfflineStore;
use wildlife_offline::trigger::ReconciliationTrigger;
use wildlife_offline::{SyncTag, WildlifeClient, WriteDisposition};

fn queue_with(connectivity: Connectivity) -> SyncQueue {
    SyncQueue::new(
        OfflineStore::in_memory(),
        reqwest::Client::new(),
        connectivity,
    )
}

fn post_config(endpoint: String) -> DeliveryConfig {
    DeliveryConfig::new(endpoint, DeliveryMethod::Post)
}

#[tokio::test]
async fn at_least_once_delivery_empties_the_queue() -> Result<()> {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/sync")
        .with_status(200)
        .expect(3)
        .create_async()
        .await;

    let connectivity = Connectivity::new(false);
    let queue = queue_with(connectivity.clone());
    for id in ["m1", "m2", "m3"] {
        queue.enqueue(json!({"id": id}), post_config(format!("{}/sync", server.url())))?;
    }
    assert_eq!(queue.pending_count(), 3);

    connectivity.set_online(true);
    let report = queue.attempt_sync().await;

    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(queue.pending_count(), 0);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn partial_failure_keeps_exactly_the_failed_subset_in_order() -> Result<()> {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("POST", "/ok")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;
    let fail = server
        .mock("POST", "/fail")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;

    let connectivity = Connectivity::new(false);
    let queue = queue_with(connectivity.clone());
    for (id, path) in [("a", "/ok"), ("b", "/fail"), ("c", "/ok"), ("d", "/fail")] {
        queue.enqueue(
            json!({"id": id}),
            post_config(format!("{}{}", server.url(), path)),
        )?;
    }

    connectivity.set_online(true);
    let report = queue.attempt_sync().await;

    assert_eq!(report.attempted, 4);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 2);
    // Exactly the failed subset remains, in original relative order
    assert_eq!(queue.pending_ids(), vec!["b", "d"]);
    ok.assert_async().await;
    fail.assert_async().await;

    // A later pass retries only what is still queued
    let retry = server
        .mock("POST", "/fail")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;
    let report = queue.attempt_sync().await;
    assert_eq!(report.delivered, 2);
    assert_eq!(queue.pending_count(), 0);
    retry.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn concurrent_sync_passes_do_not_double_deliver() -> Result<()> {
    init_logging();
    // The endpoint answers slowly, holding the first pass open while the
    // second one is attempted
    let server = StubServer::start_with_delay(
        200,
        "text/plain",
        "",
        Duration::from_millis(300),
    )
    .await;

    let connectivity = Connectivity::new(false);
    let queue = queue_with(connectivity.clone());
    queue.enqueue(
        json!({"id": "only"}),
        post_config(format!("{}/sync", server.url())),
    )?;
    connectivity.set_online(true);

    let (first, second) = tokio::join!(queue.attempt_sync(), queue.attempt_sync());

    assert_eq!(first.delivered, 1);
    assert_eq!(second.attempted, 0);
    assert_eq!(server.hits(), 1);
    assert_eq!(queue.pending_count(), 0);

    server.kill().await;
    Ok(())
}

#[tokio::test]
async fn queue_survives_restart_and_replays() -> Result<()> {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/sync")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir()?;
    {
        let queue = SyncQueue::new(
            OfflineStore::open_at(dir.path()),
            reqwest::Client::new(),
            Connectivity::new(false),
        );
        queue.enqueue(json!({"id": "kept"}), post_config(format!("{}/sync", server.url())))?;
    }

    // A new session over the same store picks the entry back up
    let connectivity = Connectivity::new(false);
    let queue = SyncQueue::new(
        OfflineStore::open_at(dir.path()),
        reqwest::Client::new(),
        connectivity.clone(),
    );
    assert_eq!(queue.pending_ids(), vec!["kept"]);

    connectivity.set_online(true);
    queue.attempt_sync().await;
    assert_eq!(queue.pending_count(), 0);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn quiz_result_submitted_offline_reaches_the_service_on_reconnect() -> Result<()> {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/quiz-results")
        .match_body(mockito::Matcher::PartialJson(json!({
            "id": "r1",
            "quiz_id": "q1",
            "score": 8
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config = OfflineConfig {
        api_base_url: server.url(),
        request_timeout_secs: 5,
        ..Default::default()
    };

    let connectivity = Connectivity::new(false);
    let store = OfflineStore::in_memory();
    let queue = SyncQueue::new(store.clone(), reqwest::Client::new(), connectivity.clone());
    let client = CachedWildlifeClient::new(
        WildlifeClient::new(&config, None)?,
        store.clone(),
        queue.clone(),
        connectivity.clone(),
        &config,
    );
    let gateway = Arc::new(Gateway::new(config, store, ResponseCache::in_memory())?);
    let trigger = ReconciliationTrigger::spawn(&connectivity, queue.clone(), gateway);

    // Offline: the submission is staged, not sent
    let result = QuizResult {
        id: "r1".to_string(),
        user_id: "u1".to_string(),
        quiz_id: "q1".to_string(),
        score: 8,
        max_score: 10,
        completed_at: None,
    };
    let disposition = client.submit_quiz_result(&result).await?;
    assert_eq!(disposition, WriteDisposition::Queued);
    assert_eq!(queue.pending_count(), 1);

    // Reconnect: the trigger drains the queue against the live endpoint
    connectivity.set_online(true);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while queue.pending_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(queue.pending_count(), 0);
    mock.assert_async().await;
    trigger.shutdown();
    Ok(())
}

#[tokio::test]
async fn background_sync_signal_drains_deferred_quiz_results() -> Result<()> {
    init_logging();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/quiz-results")
        .match_header("authorization", "Bearer session-tok")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config = OfflineConfig {
        api_base_url: server.url(),
        request_timeout_secs: 5,
        ..Default::default()
    };
    let connectivity = Connectivity::new(false);
    let store = OfflineStore::in_memory();
    let queue = SyncQueue::new(store.clone(), reqwest::Client::new(), connectivity.clone());
    let gateway = Arc::new(Gateway::new(config, store, ResponseCache::in_memory())?);

    gateway.stage_quiz_result(json!({"id": "r9", "score": 5}), Some("session-tok"))?;
    assert_eq!(gateway.pending_deferred(SyncTag::QuizResults), 1);

    let trigger = ReconciliationTrigger::spawn(&connectivity, queue, gateway.clone());
    trigger.signal(SyncTag::QuizResults).await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while gateway.pending_deferred(SyncTag::QuizResults) > 0
        && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(gateway.pending_deferred(SyncTag::QuizResults), 0);
    mock.assert_async().await;
    trigger.shutdown();
    Ok(())
}
