//! Version chains through the engine facade: append, close, time travel.

use serde_json::json;

use topograph_core::models::{CloseReason, EntityType, TenantShardKey, VersionEdgeDirection, MAX_TIMESTAMP};
use topograph_core::traits::ITopologyEngine;
use topograph_core::TopologyError;
use topograph_temporal::TopologyEngine;

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn engine() -> TopologyEngine {
    TopologyEngine::in_memory().unwrap()
}

fn acme() -> TenantShardKey {
    TenantShardKey::new("acme").unwrap()
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn device_42_time_travel() {
    let e = engine();
    let a = e
        .apply_mutation(&acme(), EntityType::Device, "42", json!({"state": "A"}), 100)
        .unwrap();
    let b = e
        .apply_mutation(&acme(), EntityType::Device, "42", json!({"state": "B"}), 200)
        .unwrap();

    let history = e.history(&acme(), EntityType::Device, "42").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!((history[0].created(), history[0].expired()), (100, 200));
    assert_eq!(history[0].close_reason, Some(CloseReason::Superseded));
    assert_eq!((history[1].created(), history[1].expired()), (200, MAX_TIMESTAMP));

    let at_150 = e.state_as_of(&acme(), EntityType::Device, "42", 150).unwrap();
    assert_eq!(at_150.id, a.id);
    assert_eq!(at_150.payload()["state"], "A");
    let at_250 = e.state_as_of(&acme(), EntityType::Device, "42", 250).unwrap();
    assert_eq!(at_250.id, b.id);

    // Boundaries are half-open.
    assert_eq!(e.state_as_of(&acme(), EntityType::Device, "42", 200).unwrap().id, b.id);
    assert_eq!(e.state_as_of(&acme(), EntityType::Device, "42", 199).unwrap().id, a.id);
}

#[test]
fn as_of_is_idempotent_without_mutations() {
    let e = engine();
    e.apply_mutation(&acme(), EntityType::Software, "ssh", json!({"v": "9.6"}), 10)
        .unwrap();
    let first = e.state_as_of(&acme(), EntityType::Software, "ssh", 50).unwrap();
    let second = e.state_as_of(&acme(), EntityType::Software, "ssh", 50).unwrap();
    assert_eq!(first, second);
}

#[test]
fn earlier_mutation_is_non_monotonic() {
    let e = engine();
    e.apply_mutation(&acme(), EntityType::Device, "42", json!({}), 100)
        .unwrap();
    let err = e
        .apply_mutation(&acme(), EntityType::Device, "42", json!({}), 50)
        .unwrap_err();
    assert!(matches!(
        err,
        TopologyError::NonMonotonicTime { current: 100, requested: 50, .. }
    ));
    assert_eq!(e.history(&acme(), EntityType::Device, "42").unwrap().len(), 1);
}

#[test]
fn identical_payload_still_appends() {
    let e = engine();
    for t in [1, 2, 3] {
        e.apply_mutation(&acme(), EntityType::Device, "7", json!({"same": true}), t)
            .unwrap();
    }
    let history = e.history(&acme(), EntityType::Device, "7").unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history.iter().filter(|v| v.is_live()).count(), 1);
}

#[test]
fn each_version_hangs_between_its_proxies() {
    let e = engine();
    let v = e
        .apply_mutation(&acme(), EntityType::Device, "42", json!({}), 100)
        .unwrap();
    let mut edges = e.store().version_edges(&v.id).unwrap();
    edges.sort_by_key(|edge| edge.direction.as_str());
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].direction, VersionEdgeDirection::ProxyToVersion);
    assert_eq!(edges[0].from_id, "device_proxy_in/42");
    assert_eq!(edges[0].to_id, v.id);
    assert_eq!(edges[1].direction, VersionEdgeDirection::VersionToProxy);
    assert_eq!(edges[1].to_id, "device_proxy_out/42");
}

#[test]
fn batch_applies_in_order_and_stops_at_failure() {
    let e = engine();
    let err = e
        .apply_batch(
            &acme(),
            vec![
                (EntityType::Device, "1".into(), json!({}), 10),
                (EntityType::Device, "1".into(), json!({}), 20),
                (EntityType::Device, "1".into(), json!({}), 15),
                (EntityType::Device, "1".into(), json!({}), 30),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, TopologyError::NonMonotonicTime { .. }));
    let history = e.history(&acme(), EntityType::Device, "1").unwrap();
    assert_eq!(history.iter().map(|v| v.created()).collect::<Vec<_>>(), vec![10, 20]);
    assert_eq!(e.pending_tenants(), vec![acme()]);
}

#[test]
fn unknown_entity_has_empty_history_and_no_state() {
    let e = engine();
    assert!(e.history(&acme(), EntityType::Location, "hq").unwrap().is_empty());
    assert!(matches!(
        e.state_as_of(&acme(), EntityType::Location, "hq", 0),
        Err(TopologyError::NotFound { .. })
    ));
}

#[test]
fn states_as_of_scans_the_tenant_snapshot() {
    let e = engine();
    e.apply_mutation(&acme(), EntityType::Device, "1", json!({"n": 1}), 100).unwrap();
    e.apply_mutation(&acme(), EntityType::Device, "2", json!({"n": 1}), 300).unwrap();
    e.apply_mutation(&acme(), EntityType::Software, "ssh", json!({}), 100).unwrap();

    let all = e.states_as_of(&acme(), None, 200).collect_all().unwrap();
    assert_eq!(all.len(), 2);
    let devices = e
        .states_as_of(&acme(), Some(EntityType::Device), 400)
        .collect_all()
        .unwrap();
    assert_eq!(devices.len(), 2);
}
