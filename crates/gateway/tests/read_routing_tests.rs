//! Integration tests for read routing with fallback.

mod common;

use std::error::Error as _;
use std::sync::Arc;

use helios_gateway::core::{Capabilities, Operation, OperationArgs, OperationSet};
use helios_gateway::meta::{FailureKind, MetaGateway, RegistrationFlags};
use helios_gateway::types::{EntityKey, ResultSetDescriptor};
use helios_gateway::GatewayError;
use serde_json::json;

use common::{RecordingSink, ScriptedGateway, call_log, source_of};

fn meta_with_sink() -> (MetaGateway, Arc<RecordingSink>) {
    let sink = RecordingSink::shared();
    (MetaGateway::with_sink(sink.clone()), sink)
}

// ============================================================================
// Fallback Tests
// ============================================================================

/// Test that a failing first backend falls back to the next one.
#[tokio::test]
async fn test_fetch_all_falls_back_on_failure() {
    let (mut meta, sink) = meta_with_sink();
    let a = ScriptedGateway::new("a").failing(Operation::FetchAll).shared();
    let b = ScriptedGateway::new("b").shared();
    meta.register_backend("a", a.clone(), 10, 0, RegistrationFlags::NONE)
        .unwrap()
        .register_backend("b", b.clone(), 0, 0, RegistrationFlags::NONE)
        .unwrap();

    let result = meta
        .fetch_all(&ResultSetDescriptor::new("users"))
        .await
        .unwrap();

    assert_eq!(source_of(&result.entities()[0]), Some("b"));
    assert!(meta.did_fallback_on_last_read());
    assert_eq!(a.calls(&Operation::FetchAll), 1);
    assert_eq!(b.calls(&Operation::FetchAll), 1);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].backend_id, "a");
    assert_eq!(records[0].kind, FailureKind::Read);
    assert_eq!(records[0].operation, Operation::FetchAll);
    assert_eq!(records[0].args["value"]["collection"], json!("users"));
}

/// Test that the first success wins and lower backends are never consulted.
#[tokio::test]
async fn test_first_success_wins() {
    let (mut meta, sink) = meta_with_sink();
    let high = ScriptedGateway::new("high").shared();
    let low = ScriptedGateway::new("low").shared();
    meta.register_backend("low", low.clone(), 0, 0, RegistrationFlags::NONE)
        .unwrap()
        .register_backend("high", high.clone(), 10, 0, RegistrationFlags::NONE)
        .unwrap();

    let entity = meta.fetch_one(&EntityKey::new("users", "1")).await.unwrap();

    assert_eq!(source_of(&entity), Some("high"));
    assert_eq!(entity.id(), Some("1"));
    assert!(!meta.did_fallback_on_last_read());
    assert_eq!(low.total_calls(), 0);
    assert!(sink.is_empty());
}

/// Test that backends are attempted in descending read priority.
#[tokio::test]
async fn test_attempts_follow_read_priority() {
    let log = call_log();
    let mut meta = MetaGateway::new();
    for (id, priority) in [("mid", 0), ("top", 10), ("bottom", -5)] {
        let gateway = ScriptedGateway::new(id)
            .failing(Operation::Fetch)
            .with_log(&log)
            .shared();
        meta.register_backend(id, gateway, priority, 0, RegistrationFlags::NONE)
            .unwrap();
    }

    let err = meta
        .fetch(&ResultSetDescriptor::new("users"))
        .await
        .unwrap_err();

    assert_eq!(
        *log.lock(),
        vec!["top:fetch", "mid:fetch", "bottom:fetch"]
    );
    assert_eq!(
        err.attempted_backends(),
        Some(&["top".to_string(), "mid".to_string(), "bottom".to_string()][..])
    );
}

/// Test that fallback is flagged only when more than one backend was attempted.
#[tokio::test]
async fn test_fallback_flag_reset_on_next_read() {
    let mut meta = MetaGateway::new();
    let a = ScriptedGateway::new("a").failing(Operation::FetchOne).shared();
    meta.register_backend("a", a.clone(), 10, 0, RegistrationFlags::NONE)
        .unwrap()
        .register("b", ScriptedGateway::new("b").shared())
        .unwrap();

    let key = EntityKey::new("users", "1");
    meta.fetch_one(&key).await.unwrap();
    assert!(meta.did_fallback_on_last_read());

    // fetch_all is served by "a" directly
    meta.fetch_all(&ResultSetDescriptor::new("users"))
        .await
        .unwrap();
    assert!(!meta.did_fallback_on_last_read());
}

// ============================================================================
// Exhaustion Tests
// ============================================================================

/// Test that a single failing backend yields NoBackendSucceeded.
#[tokio::test]
async fn test_single_failing_backend() {
    let (mut meta, sink) = meta_with_sink();
    meta.register("a", ScriptedGateway::new("a").failing(Operation::FetchAll).shared())
        .unwrap();

    let err = meta
        .fetch_all(&ResultSetDescriptor::new("users"))
        .await
        .unwrap_err();

    match &err {
        GatewayError::NoBackendSucceeded {
            operation,
            attempted,
            registered,
            source,
        } => {
            assert_eq!(operation, "fetch_all");
            assert_eq!(attempted, &vec!["a".to_string()]);
            assert_eq!(registered, &vec!["a (a)".to_string()]);
            assert!(source.is_some());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!meta.did_fallback_on_last_read());
    assert_eq!(sink.len(), 1);
}

/// Test that the last underlying error is kept as the cause.
#[tokio::test]
async fn test_last_error_is_cause() {
    let mut meta = MetaGateway::new();
    meta.register_backend(
        "first",
        ScriptedGateway::new("first").failing(Operation::Fetch).shared(),
        10,
        0,
        RegistrationFlags::NONE,
    )
    .unwrap()
    .register(
        "last",
        ScriptedGateway::new("last").failing(Operation::Fetch).shared(),
    )
    .unwrap();

    let err = meta
        .fetch(&ResultSetDescriptor::new("users"))
        .await
        .unwrap_err();

    assert!(err.is_no_backend_succeeded());
    let cause = err.source().expect("cause should be preserved");
    assert_eq!(cause.to_string(), "backend unavailable: last");
}

/// Test that reading with no backend fails with an empty attempt list.
#[tokio::test]
async fn test_no_backend_registered() {
    let meta = MetaGateway::new();
    let err = meta
        .fetch_one(&EntityKey::new("users", "1"))
        .await
        .unwrap_err();

    match err {
        GatewayError::NoBackendSucceeded {
            attempted,
            registered,
            source,
            ..
        } => {
            assert!(attempted.is_empty());
            assert!(registered.is_empty());
            assert!(source.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Capability Filtering Tests
// ============================================================================

/// Test that backends refusing the operation are skipped and not counted.
#[tokio::test]
async fn test_ineligible_backends_are_skipped() {
    let (mut meta, sink) = meta_with_sink();
    let writer = ScriptedGateway::new("writer")
        .with_capabilities(Capabilities::new(OperationSet::WRITE))
        .shared();
    let reader = ScriptedGateway::new("reader").shared();
    meta.register_backend("writer", writer.clone(), 10, 0, RegistrationFlags::NONE)
        .unwrap()
        .register("reader", reader.clone())
        .unwrap();

    let entity = meta.fetch_one(&EntityKey::new("users", "1")).await.unwrap();

    assert_eq!(source_of(&entity), Some("reader"));
    assert!(!meta.did_fallback_on_last_read());
    assert_eq!(writer.total_calls(), 0);
    assert!(sink.is_empty());
}

/// Test that a capability predicate sees the call arguments.
#[tokio::test]
async fn test_predicate_routes_by_collection() {
    let mut meta = MetaGateway::new();
    let search = ScriptedGateway::new("search")
        .with_capabilities(Capabilities::all().with_predicate(Operation::FetchAll, |args| {
            matches!(args, OperationArgs::Descriptor(d) if d.collection() == "articles")
        }))
        .shared();
    meta.register_backend("search", search.clone(), 10, 0, RegistrationFlags::NONE)
        .unwrap()
        .register("sql", ScriptedGateway::new("sql").shared())
        .unwrap();

    let articles = meta
        .fetch_all(&ResultSetDescriptor::new("articles"))
        .await
        .unwrap();
    let users = meta
        .fetch_all(&ResultSetDescriptor::new("users"))
        .await
        .unwrap();

    assert_eq!(source_of(&articles.entities()[0]), Some("search"));
    assert_eq!(source_of(&users.entities()[0]), Some("sql"));
    assert_eq!(search.calls(&Operation::FetchAll), 1);
}

/// Test that no eligible backend at all yields NoBackendSucceeded.
#[tokio::test]
async fn test_no_eligible_backend() {
    let mut meta = MetaGateway::new();
    meta.register(
        "writer",
        ScriptedGateway::new("writer")
            .with_capabilities(Capabilities::new(OperationSet::WRITE))
            .shared(),
    )
    .unwrap();

    let err = meta
        .fetch(&ResultSetDescriptor::new("users"))
        .await
        .unwrap_err();

    assert!(err.is_no_backend_succeeded());
    assert_eq!(err.attempted_backends(), Some(&[][..]));
}

// ============================================================================
// Statistics Tests
// ============================================================================

/// Test that outcome counters follow read attempts.
#[tokio::test]
async fn test_read_outcomes_are_counted() {
    let mut meta = MetaGateway::new();
    meta.register_backend(
        "cache",
        ScriptedGateway::new("cache").failing(Operation::FetchOne).shared(),
        10,
        0,
        RegistrationFlags::NONE,
    )
    .unwrap()
    .register("sql", ScriptedGateway::new("sql").shared())
    .unwrap();

    let key = EntityKey::new("users", "1");
    for _ in 0..3 {
        meta.fetch_one(&key).await.unwrap();
    }

    let cache = meta.backend_stats("cache").unwrap();
    assert_eq!(cache.failures, 3);
    assert_eq!(cache.consecutive_failures, 3);
    assert!(cache.is_degraded());

    let sql = meta.backend_stats("sql").unwrap();
    assert_eq!(sql.successes, 3);
    assert_eq!(meta.stats().degraded(), vec!["cache".to_string()]);
}
