// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: events in, webhook POSTs and websocket frames out.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zapkeep_config::ZapkeepConfig;
use zapkeep_core::EventKind;
use zapkeep_dispatch::{
    ArchivePolicy, ArchivePolicyScheduler, EventPipeline, FailureLog, FilterConfig,
    MediaCollaborators, NotificationDispatcher, WebsocketHub, shutdown,
};
use zapkeep_store::SessionTokenRegistry;
use zapkeep_test_utils::{MemoryStore, RecordingChatControl, StaticMediaFetcher, fixtures};

struct Running {
    pipeline: EventPipeline,
    hub: WebsocketHub,
    failures: Arc<FailureLog>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

fn config(server: &MockServer) -> ZapkeepConfig {
    let mut config = ZapkeepConfig::default();
    config.webhook.url = Some(format!("{}/hook", server.uri()));
    config.webhook.read_message = false;
    config.webhook.initial_backoff_ms = 1;
    config.webhook.max_backoff_ms = 4;
    config
}

fn start(config: &ZapkeepConfig, media: MediaCollaborators) -> Running {
    let hub = WebsocketHub::new(config.server.max_listeners, config.websocket.queue_capacity);
    let failures = Arc::new(FailureLog::default());
    let (dispatcher, tasks) = NotificationDispatcher::start(
        config,
        hub.clone(),
        media,
        failures.clone(),
        CancellationToken::new(),
    )
    .unwrap();

    let pipeline = EventPipeline::new(
        FilterConfig::from_config(config),
        Arc::new(SessionTokenRegistry::new(Arc::new(MemoryStore::new()))),
        dispatcher,
        Arc::new(ArchivePolicyScheduler::new(ArchivePolicy::from_config(&config.archive))),
        Arc::new(RecordingChatControl::new()),
    );

    Running {
        pipeline,
        hub,
        failures,
        tasks,
    }
}

/// Drops the pipeline so the workers drain their queues, then waits for them.
async fn settle(running: Running) -> (WebsocketHub, Arc<FailureLog>) {
    let Running {
        pipeline,
        hub,
        failures,
        tasks,
    } = running;
    drop(pipeline);
    assert_eq!(shutdown::drain_tasks(tasks, Duration::from_secs(10)).await, 0);
    (hub, failures)
}

#[tokio::test]
async fn reaction_produces_exactly_one_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({
            "event": "reaction",
            "id": "r1",
            "session": fixtures::SESSION,
            "payload": { "reaction": "👍" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let running = start(&config(&server), MediaCollaborators::default());
    let decision = running.pipeline.submit(fixtures::reaction("r1", "👍")).await;
    assert!(decision.webhook_eligible);

    settle(running).await;
    server.verify().await;
}

#[tokio::test]
async fn disabled_flag_keeps_event_off_the_webhook_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.webhook.on_reaction_message = false;
    let running = start(&config, MediaCollaborators::default());
    let sub = running.hub.subscribe(None).unwrap();

    let decision = running.pipeline.submit(fixtures::reaction("r1", "👍")).await;
    assert!(!decision.webhook_eligible);
    assert!(decision.websocket_eligible);

    let frame = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap()
        .unwrap();
    let frame: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(frame["event"], "reaction");

    drop(sub);
    settle(running).await;
}

#[tokio::test]
async fn backlog_beyond_ceiling_is_delivered_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(10)))
        .expect(30)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.webhook.concurrency = 1;
    config.websocket.enabled = false;
    let running = start(&config, MediaCollaborators::default());

    for i in 0..30 {
        running
            .pipeline
            .submit(fixtures::message(&format!("m{i:02}")))
            .await;
    }
    settle(running).await;

    let ids: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            body["id"].as_str().unwrap().to_string()
        })
        .collect();
    let expected: Vec<String> = (0..30).map(|i| format!("m{i:02}")).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn exhausted_retries_land_in_failure_log() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.webhook.max_attempts = 2;
    config.websocket.enabled = false;
    let running = start(&config, MediaCollaborators::default());
    running.pipeline.submit(fixtures::message("m1")).await;

    let (_, failures) = settle(running).await;
    let recent = failures.recent();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].event_id, "m1");
    assert_eq!(recent[0].channel, "webhook");
    assert_eq!(recent[0].attempts, 2);
}

#[tokio::test]
async fn media_is_inlined_for_the_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "id": "img1",
            "media_error": false,
            "media": { "mimetype": "image/jpeg", "base64": "AQID" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.websocket.enabled = false;
    let media = MediaCollaborators {
        fetcher: Some(Arc::new(StaticMediaFetcher::returning(&[1, 2, 3], "image/jpeg"))),
        storage: None,
    };
    let running = start(&config, media);
    running
        .pipeline
        .submit(fixtures::media_message("img1", "http://example.invalid/1.jpg"))
        .await;

    settle(running).await;
    server.verify().await;
}

#[tokio::test]
async fn ignored_sender_reaches_no_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let running = start(&config(&server), MediaCollaborators::default());
    let sub = running.hub.subscribe(None).unwrap();
    let event = fixtures::event_from(EventKind::Message, "status@broadcast");
    assert!(running.pipeline.submit(event).await.suppressed.is_some());

    running.hub.close_all();
    assert_eq!(sub.recv().await, None);
    drop(sub);
    settle(running).await;
}
