//! Connectivity enforcement: bridging passes, determinism, repair, failure.

use std::collections::BTreeSet;

use serde_json::json;

use topograph_core::config::ConnectivityConfig;
use topograph_core::models::{
    DomainEdgeKind, DomainEdgeSpec, EntityRef, EntityType, ProxyRole, ProxyVertex, TenantShardKey,
};
use topograph_core::traits::ITopologyEngine;
use topograph_core::{TopologyConfig, TopologyError};
use topograph_temporal::TopologyEngine;

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn acme() -> TenantShardKey {
    TenantShardKey::new("acme").unwrap()
}

fn software_tenant(count: usize) -> TopologyEngine {
    let e = TopologyEngine::in_memory().unwrap();
    for i in 0..count {
        e.apply_mutation(&acme(), EntityType::Software, &format!("pkg-{i:02}"), json!({}), 10)
            .unwrap();
    }
    e
}

fn bridge_keys(e: &TopologyEngine) -> BTreeSet<String> {
    e.store()
        .list_bridging_edges(&acme())
        .unwrap()
        .into_iter()
        .map(|edge| edge.bridge_key)
        .collect()
}

// ─── Bridging ────────────────────────────────────────────────────────────────

#[test]
fn ten_by_ten_software_leaves_no_orphans() {
    let e = software_tenant(10);
    assert_eq!(e.orphans(&acme()).unwrap().len(), 20);

    let report = e.enforce_connectivity(&acme()).unwrap();
    assert_eq!(report.proxies_scanned, 20);
    assert_eq!(report.coverage_fallbacks, 0);
    assert_eq!(report.repair_passes, 0);
    assert_eq!(report.orphans_remaining, 0);
    assert!(report.edges_created.contains_key("software_proxy_network"));
    assert!(e.orphans(&acme()).unwrap().is_empty());

    let view = e.connectivity_report(&acme()).unwrap();
    assert_eq!(view.proxy_count, 20);
    assert_eq!(view.domain_edge_count, 0);
    assert_eq!(view.bridging_by_type.len(), 1);
}

#[test]
fn edge_set_is_reproducible_for_fixed_modulus() {
    let first = software_tenant(10);
    let second = software_tenant(10);
    first.enforce_connectivity(&acme()).unwrap();
    second.enforce_connectivity(&acme()).unwrap();
    assert_eq!(bridge_keys(&first), bridge_keys(&second));

    // A second run over an unchanged tenant adds and removes nothing.
    let again = first.enforce_connectivity(&acme()).unwrap();
    assert_eq!(again.total_created(), 0);
    assert_eq!(again.total_removed(), 0);
}

#[test]
fn incremental_enforcement_matches_a_fresh_run() {
    let incremental = TopologyEngine::in_memory().unwrap();
    for i in 1..10 {
        incremental
            .apply_mutation(&acme(), EntityType::Software, &format!("pkg-{i:02}"), json!({}), 10)
            .unwrap();
    }
    incremental.enforce_connectivity(&acme()).unwrap();

    // pkg-00 sorts first and shifts every network index after it.
    incremental
        .apply_mutation(&acme(), EntityType::Software, "pkg-00", json!({}), 10)
        .unwrap();
    let report = incremental.enforce_connectivity(&acme()).unwrap();
    assert!(report.edges_removed.get("software_proxy_network").copied().unwrap_or(0) > 0);
    assert_eq!(report.orphans_remaining, 0);

    let fresh = software_tenant(10);
    fresh.enforce_connectivity(&acme()).unwrap();
    assert_eq!(bridge_keys(&incremental), bridge_keys(&fresh));
}

#[test]
fn modulus_changes_the_edge_set() {
    let mut config = TopologyConfig::default();
    config.connectivity.modulus = 4;
    let other = TopologyEngine::new(config).unwrap();
    for i in 0..10 {
        other
            .apply_mutation(&acme(), EntityType::Software, &format!("pkg-{i:02}"), json!({}), 10)
            .unwrap();
    }
    let default = software_tenant(10);
    other.enforce_connectivity(&acme()).unwrap();
    default.enforce_connectivity(&acme()).unwrap();
    assert_ne!(bridge_keys(&other), bridge_keys(&default));
}

#[test]
fn cross_domain_bridges_pair_out_proxies_by_index() {
    let e = TopologyEngine::in_memory().unwrap();
    for id in ["d1", "d2"] {
        e.apply_mutation(&acme(), EntityType::Device, id, json!({}), 1).unwrap();
    }
    for id in ["s1", "s2"] {
        e.apply_mutation(&acme(), EntityType::Software, id, json!({}), 1).unwrap();
    }
    e.apply_mutation(&acme(), EntityType::Location, "hq", json!({}), 1).unwrap();

    let report = e.enforce_connectivity(&acme()).unwrap();
    assert_eq!(report.edges_created.get("cross_domain_proxy"), Some(&3));

    let cross: Vec<_> = e
        .store()
        .list_bridging_edges(&acme())
        .unwrap()
        .into_iter()
        .filter(|edge| edge.connection_type.as_string() == "cross_domain_proxy")
        .collect();
    assert!(cross.iter().all(|edge| edge.from_proxy.starts_with("device_proxy_out/")));
    assert!(cross.iter().any(|edge| edge.to_proxy == "location_proxy_out/hq"));
    assert!(cross.iter().all(|edge| edge.attributes["synthetic"] == true));
}

#[test]
fn version_successions_are_bridged() {
    let e = TopologyEngine::in_memory().unwrap();
    for t in [100, 200, 300] {
        e.apply_mutation(&acme(), EntityType::Device, "42", json!({ "t": t }), t)
            .unwrap();
    }
    let report = e.enforce_connectivity(&acme()).unwrap();
    assert_eq!(report.edges_created.get("temporal_sequence"), Some(&2));
    assert_eq!(report.repair_passes, 0);
}

// ─── Domain edges ────────────────────────────────────────────────────────────

#[test]
fn domain_edges_only_touch_proxies() {
    let e = TopologyEngine::in_memory().unwrap();
    e.apply_mutation(&acme(), EntityType::Device, "42", json!({}), 1).unwrap();
    e.apply_mutation(&acme(), EntityType::Device, "42", json!({}), 2).unwrap();
    let edge = e
        .link(DomainEdgeSpec::new(
            acme(),
            DomainEdgeKind::HasLocation,
            EntityRef::new(EntityType::Device, "42"),
            EntityRef::new(EntityType::Location, "hq"),
        ))
        .unwrap();
    assert_eq!(edge.from_proxy, "device_proxy_out/42");
    assert_eq!(edge.to_proxy, "location_proxy_in/hq");

    // A third version leaves the edge untouched.
    e.apply_mutation(&acme(), EntityType::Device, "42", json!({}), 3).unwrap();
    let edges = e.domain_edges(&acme()).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0], edge);

    let version_ids: BTreeSet<String> = e
        .history(&acme(), EntityType::Device, "42")
        .unwrap()
        .into_iter()
        .map(|v| v.id)
        .collect();
    assert!(!version_ids.contains(&edges[0].from_proxy));
    assert!(!version_ids.contains(&edges[0].to_proxy));
}

#[test]
fn relinking_refreshes_attributes_in_place() {
    let e = TopologyEngine::in_memory().unwrap();
    let spec = DomainEdgeSpec::new(
        acme(),
        DomainEdgeKind::HasConnection,
        EntityRef::new(EntityType::Device, "a"),
        EntityRef::new(EntityType::Device, "b"),
    );
    e.link(spec.clone().with_attributes(json!({"bandwidth_mbps": 100})))
        .unwrap();
    let updated = e
        .link(spec.with_attributes(json!({"bandwidth_mbps": 1000})))
        .unwrap();
    let edges = e.domain_edges(&acme()).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(updated.attributes["bandwidth_mbps"], 1000);
}

// ─── Failure ─────────────────────────────────────────────────────────────────

#[test]
fn unrepairable_tenant_fails_alone() {
    let e = TopologyEngine::in_memory().unwrap();
    let lonely = TenantShardKey::new("lonely").unwrap();
    e.store()
        .insert_proxy(&ProxyVertex::new(lonely.clone(), EntityType::Device, "solo", ProxyRole::In, 0))
        .unwrap();
    e.apply_mutation(&acme(), EntityType::Device, "42", json!({}), 1).unwrap();

    match e.enforce_connectivity(&lonely) {
        Err(TopologyError::ConnectivityInvariantViolation { tenant, orphans }) => {
            assert_eq!(tenant, "lonely");
            assert_eq!(orphans, vec!["device_proxy_in/solo".to_string()]);
        }
        other => panic!("expected violation, got {other:?}"),
    }
    assert!(e.enforce_connectivity(&acme()).is_ok());
}

#[test]
fn rebuild_restores_the_same_bridges() {
    let e = software_tenant(6);
    e.enforce_connectivity(&acme()).unwrap();
    let before = bridge_keys(&e);
    let report = e.rebuild_connectivity(&acme()).unwrap();
    assert_eq!(report.total_created(), before.len());
    assert_eq!(bridge_keys(&e), before);
}

#[test]
fn enforcer_settings_come_from_config() {
    let config = ConnectivityConfig {
        internal_bridging_domains: vec![],
        cross_domain_pairs: vec![],
        ..ConnectivityConfig::default()
    };
    let mut full = TopologyConfig::default();
    full.connectivity = config;
    let e = TopologyEngine::new(full).unwrap();
    for i in 0..3 {
        e.apply_mutation(&acme(), EntityType::Software, &format!("p{i}"), json!({}), 1)
            .unwrap();
    }
    let report = e.enforce_connectivity(&acme()).unwrap();
    // Only partner repair edges are left to connect the pairs.
    assert_eq!(report.repair_passes, 1);
    assert_eq!(report.edges_created.get("orphan_fallback"), Some(&3));
}
