//! Integration tests for building an orchestrator from configuration.

mod common;

use std::collections::HashMap;

use helios_gateway::core::{DynGateway, Operation};
use helios_gateway::error::ConfigError;
use helios_gateway::meta::{MetaGateway, MetaGatewayConfig, WRITING_MASTER_PRIORITY};
use helios_gateway::types::Entity;
use helios_gateway::GatewayError;

use common::{ScriptedGateway, call_log};

fn gateways(ids: &[&str]) -> HashMap<String, DynGateway> {
    ids.iter()
        .map(|id| {
            let gateway: DynGateway = ScriptedGateway::new(*id).shared();
            (id.to_string(), gateway)
        })
        .collect()
}

// ============================================================================
// Build Tests
// ============================================================================

/// Test that entries are registered with their priorities and flags.
#[test]
fn test_from_config_registers_entries() {
    let config = MetaGatewayConfig::from_json(
        r#"{
            "backends": [
                { "id": "sql", "writing_master": true, "write_priority": 3 },
                { "id": "cache", "read_priority": 10, "write_priority": -10 },
                { "id": "search", "read_priority": -10 }
            ]
        }"#,
    )
    .unwrap();

    let meta = MetaGateway::from_config(&config, &gateways(&["sql", "cache", "search"])).unwrap();

    assert_eq!(meta.backend_ids(), vec!["sql", "cache", "search"]);
    assert_eq!(meta.writing_master(), Some("sql"));
    assert_eq!(meta.read_priorities().ids(), vec!["cache", "sql", "search"]);
    assert_eq!(
        meta.write_priorities().priorities(),
        vec![WRITING_MASTER_PRIORITY, 0, -10]
    );
}

/// Test that disabled entries are not registered and need no adapter.
#[test]
fn test_disabled_entries_skipped() {
    let config = MetaGatewayConfig::from_json(
        r#"{
            "backends": [
                { "id": "sql" },
                { "id": "legacy", "enabled": false }
            ]
        }"#,
    )
    .unwrap();

    let meta = MetaGateway::from_config(&config, &gateways(&["sql"])).unwrap();
    assert_eq!(meta.backend_ids(), vec!["sql"]);
}

/// Test that a missing adapter fails with BackendNotFound.
#[test]
fn test_missing_adapter() {
    let config = MetaGatewayConfig::builder()
        .writing_master("sql", 0)
        .backend("search", 0, 0)
        .build()
        .unwrap();

    let err = MetaGateway::from_config(&config, &gateways(&["sql"])).unwrap_err();
    assert!(matches!(err, GatewayError::BackendNotFound { ref id } if id == "search"));
}

/// Test that an invalid configuration is rejected before registration.
#[test]
fn test_invalid_config_rejected() {
    let config = MetaGatewayConfig::from_json(
        r#"{ "backends": [ { "id": "a", "writing_master": true }, { "id": "b", "writing_master": true } ] }"#,
    )
    .unwrap();

    let err = MetaGateway::from_config(&config, &gateways(&["a", "b"])).unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Config(ConfigError::MultipleWritingMasters(_))
    ));
}

/// Test that malformed documents are reported as parse errors.
#[test]
fn test_malformed_document() {
    let err = MetaGatewayConfig::from_json(r#"{ "backends": [ { "read_priority": 1 } ] }"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

// ============================================================================
// Routing Tests
// ============================================================================

/// Test that an orchestrator built from configuration routes like a hand-built one.
#[tokio::test]
async fn test_configured_orchestrator_routes_writes() {
    let log = call_log();
    let mut adapters: HashMap<String, DynGateway> = HashMap::new();
    for id in ["sql", "search"] {
        adapters.insert(
            id.to_string(),
            ScriptedGateway::new(id).with_log(&log).shared(),
        );
    }

    let config = MetaGatewayConfig::builder()
        .backend("search", 0, 100)
        .writing_master("sql", 0)
        .build()
        .unwrap();
    let meta = MetaGateway::from_config(&config, &adapters).unwrap();

    assert!(meta.persist(&[Entity::new("users")]).await.unwrap());
    assert_eq!(*log.lock(), vec!["sql:persist", "search:persist"]);
    assert_eq!(
        meta.backend_stats("search").map(|s| s.successes),
        Some(1)
    );
    assert!(meta.can(&Operation::Purge, &helios_gateway::OperationArgs::None));
}
