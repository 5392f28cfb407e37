//! Tests for `CorrelationRouter`: binding and token-scoped delivery.
//!
//! Connections are registered directly on the registry and their outbound
//! channels stand in for WebSocket sinks.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{drain_events, shape, token, FixedShape};
use hyperspace_api::correlation::CorrelationRouter;
use hyperspace_api::ws::ConnectionRegistry;
use hyperspace_core::error::CoreError;
use hyperspace_core::executor::{JobExecutor, JobOutcome};
use hyperspace_core::shape::{JobPayload, ShapeGenerator};

fn setup() -> (Arc<ConnectionRegistry>, CorrelationRouter) {
    let registry = Arc::new(ConnectionRegistry::new());
    let router = CorrelationRouter::new(Arc::clone(&registry));
    (registry, router)
}

// ---------------------------------------------------------------------------
// Scenario: no connection ever binds -> nothing is sent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deliver_without_bindings_sends_nothing() {
    let (registry, router) = setup();
    let mut rx = registry.register("C1".to_string()).await;

    let delivered = router
        .deliver(&token("T1"), JobOutcome::Completed(shape("a.csv")))
        .await;

    assert_eq!(delivered, 0);
    assert!(drain_events(&mut rx).is_empty());
}

// ---------------------------------------------------------------------------
// Scenario: two bound connections each receive the result exactly once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deliver_reaches_exactly_the_bound_connections() {
    let (registry, router) = setup();
    let mut rx1 = registry.register("C1".to_string()).await;
    let mut rx2 = registry.register("C2".to_string()).await;
    let mut rx_other = registry.register("C3".to_string()).await;

    router.bind_request("C1", &token("T2")).await.unwrap();
    router.bind_request("C2", &token("T2")).await.unwrap();
    router.bind_request("C3", &token("T-other")).await.unwrap();

    let delivered = router
        .deliver(&token("T2"), JobOutcome::Completed(shape("a.csv")))
        .await;
    assert_eq!(delivered, 2);

    for rx in [&mut rx1, &mut rx2] {
        let events = drain_events(rx);
        assert_eq!(events.len(), 1);
        let (event, payload) = &events[0];
        assert_eq!(event, "ShapeProcessingComplete");
        assert_eq!(payload["sourceFile"], "a.csv");
        let vertices: Vec<f32> = serde_json::from_value(payload["vertices"].clone()).unwrap();
        assert_eq!(vertices, vec![0.1, 0.2, 0.3]);
    }
    assert!(drain_events(&mut rx_other).is_empty());
}

// ---------------------------------------------------------------------------
// Scenario: bound connection disconnects before completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deliver_after_disconnect_sends_nothing() {
    let (registry, router) = setup();
    let mut rx = registry.register("C1".to_string()).await;
    router.bind_request("C1", &token("T3")).await.unwrap();

    registry.unregister("C1").await;

    let delivered = router
        .deliver(&token("T3"), JobOutcome::Completed(shape("a.csv")))
        .await;

    assert_eq!(delivered, 0);
    // Only the registry dropped its sender; nothing was queued before that.
    assert!(drain_events(&mut rx).is_empty());
    assert_eq!(registry.group_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: a member whose channel closed does not block the others
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_member_does_not_abort_fan_out() {
    let (registry, router) = setup();
    let rx_gone = registry.register("C1".to_string()).await;
    let mut rx_live = registry.register("C2".to_string()).await;
    router.bind_request("C1", &token("T4")).await.unwrap();
    router.bind_request("C2", &token("T4")).await.unwrap();

    // C1's socket went away but it has not been unregistered yet.
    drop(rx_gone);

    let delivered = router
        .deliver(&token("T4"), JobOutcome::Completed(shape("b.csv")))
        .await;

    assert_eq!(delivered, 1);
    let events = drain_events(&mut rx_live);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "ShapeProcessingComplete");
}

// ---------------------------------------------------------------------------
// Test: failures travel the same path under their own event name
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_outcome_is_delivered_as_failure_event() {
    let (registry, router) = setup();
    let mut rx = registry.register("C1".to_string()).await;
    router.bind_request("C1", &token("T5")).await.unwrap();

    let delivered = router
        .deliver(&token("T5"), JobOutcome::Failed("corrupt recording".to_string()))
        .await;

    assert_eq!(delivered, 1);
    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    let (event, payload) = &events[0];
    assert_eq!(event, "ShapeProcessingFailed");
    assert_eq!(payload["trackingId"], "T5");
    assert_eq!(payload["error"], "corrupt recording");
}

// ---------------------------------------------------------------------------
// Test: bind_request validation and propagation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bind_request_propagates_unknown_connection() {
    let (_registry, router) = setup();

    let result = router.bind_request("ghost", &token("T1")).await;

    assert_matches!(result, Err(CoreError::UnknownConnection(_)));
}

#[tokio::test]
async fn bind_request_rejects_blank_token() {
    let (registry, router) = setup();
    let _rx = registry.register("C1".to_string()).await;

    let result = router.bind_request("C1", &token("  ")).await;

    assert_matches!(result, Err(CoreError::Validation(_)));
    assert_eq!(registry.group_count().await, 0);
}

#[tokio::test]
async fn duplicate_bind_delivers_once() {
    let (registry, router) = setup();
    let mut rx = registry.register("C1".to_string()).await;
    router.bind_request("C1", &token("T6")).await.unwrap();
    router.bind_request("C1", &token("T6")).await.unwrap();

    router
        .deliver(&token("T6"), JobOutcome::Completed(shape("a.csv")))
        .await;

    assert_eq!(drain_events(&mut rx).len(), 1);
}

// ---------------------------------------------------------------------------
// Test: executor completions flow through run() to bound connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_delivers_executor_completions() {
    let (registry, router) = setup();
    let router = Arc::new(router);
    let (executor, completions) = JobExecutor::new(Arc::new(FixedShape), 2);
    let router_task = tokio::spawn(Arc::clone(&router).run(completions));

    let mut rx = registry.register("C1".to_string()).await;
    router.bind_request("C1", &token("T7")).await.unwrap();

    executor
        .submit(
            token("T7"),
            JobPayload {
                file_name: "run.csv".to_string(),
                contents: b"1,2,3".to_vec(),
            },
        )
        .unwrap();

    let message = rx.recv().await.expect("result should be delivered");
    let (event, payload) = common::decode_event(message);
    assert_eq!(event, "ShapeProcessingComplete");
    assert_eq!(payload["sourceFile"], "run.csv");

    // Closing the completion channel ends the router loop.
    assert!(executor.shutdown(Duration::from_secs(1)).await);
    drop(executor);
    router_task.await.expect("router task should exit cleanly");
}

#[tokio::test(start_paused = true)]
async fn slow_job_result_reaches_client_bound_after_submission() {
    let (registry, router) = setup();
    let router = Arc::new(router);
    let (executor, completions) =
        JobExecutor::new(Arc::new(ShapeGenerator::new(Duration::from_secs(5))), 2);
    tokio::spawn(Arc::clone(&router).run(completions));

    executor
        .submit(
            token("T8"),
            JobPayload {
                file_name: "a.csv".to_string(),
                contents: b"x".to_vec(),
            },
        )
        .unwrap();

    // The client binds after the upload returned but well before the job ends.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let mut rx = registry.register("C1".to_string()).await;
    router.bind_request("C1", &token("T8")).await.unwrap();

    let (event, payload) = common::decode_event(rx.recv().await.expect("result delivered"));
    assert_eq!(event, "ShapeProcessingComplete");
    assert_eq!(payload["vertices"].as_array().map(Vec::len), Some(1005 * 3));
}
