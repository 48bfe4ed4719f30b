//! ConnectivityInvariantEnforcer: background reconciliation of the
//! no-orphan invariant for one tenant.
//!
//! Runs the bridging passes in a fixed order over proxies sorted by
//! `(external_id, id)`, persists the planned edges idempotently and prunes
//! index-derived bridges the current proxy set no longer plans. The
//! postcondition is then checked against a freshly built degree index.
//! Orphans left over get bounded repair passes before the tenant is reported
//! as violated.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use topograph_core::config::ConnectivityConfig;
use topograph_core::models::{
    BridgeType, BridgingEdge, ConnectivityReport, EnforcementReport, EntityType, ProxyRole,
    ProxyVertex, TenantShardKey,
};
use topograph_core::traits::ITopologyStore;
use topograph_core::{TopologyError, TopologyResult};

use super::bridging::BridgePlanner;
use super::degree::{component_count, DegreeIndex};
use crate::wall_clock;

pub struct ConnectivityInvariantEnforcer {
    store: Arc<dyn ITopologyStore>,
    config: ConnectivityConfig,
}

impl ConnectivityInvariantEnforcer {
    pub fn new(store: Arc<dyn ITopologyStore>, config: ConnectivityConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ConnectivityConfig {
        &self.config
    }

    /// Bridge every proxy of `tenant` into the graph.
    ///
    /// Fails with `ConnectivityInvariantViolation` only when orphans survive
    /// every repair pass. Edges inserted before the failure stay in place.
    pub fn enforce(&self, tenant: &TenantShardKey) -> TopologyResult<EnforcementReport> {
        let start = Instant::now();
        let proxies = self.store.list_proxies(tenant)?;
        let planner = BridgePlanner::new(tenant, &self.config, wall_clock());
        let mut report = EnforcementReport {
            tenant: Some(tenant.clone()),
            proxies_scanned: proxies.len(),
            ..EnforcementReport::default()
        };

        let mut planned: Vec<BridgingEdge> = Vec::new();

        // Temporal chains.
        let versions = self.store.versions_for_tenant(tenant)?;
        planned.extend(planner.temporal_sequence(&versions));

        // Domain-internal networks.
        for &domain in &self.config.internal_bridging_domains {
            let outs = by_role(&proxies, domain, ProxyRole::Out);
            let ins = by_role(&proxies, domain, ProxyRole::In);
            let (edges, fallbacks) = planner.domain_network(domain, &outs, &ins);
            if fallbacks > 0 {
                debug!(tenant = %tenant, domain = %domain, fallbacks, "coverage fallback edges planned");
            }
            report.coverage_fallbacks += fallbacks;
            planned.extend(edges);
        }

        // Cross-domain bridges.
        for &(a, b) in &self.config.cross_domain_pairs {
            let a_outs = by_role(&proxies, a, ProxyRole::Out);
            let b_outs = by_role(&proxies, b, ProxyRole::Out);
            planned.extend(planner.cross_domain(&a_outs, &b_outs));
        }

        let planned_keys: HashSet<String> = planned.iter().map(|e| e.bridge_key.clone()).collect();
        self.persist(planned, &mut report)?;
        self.prune_stale(tenant, &planned_keys, &mut report)?;

        // Postcondition.
        let mut orphans = self.degree_index(tenant, &proxies)?.orphans();
        if !orphans.is_empty() {
            warn!(
                tenant = %tenant,
                orphans = orphans.len(),
                "connectivity invariant violated after bridging, repairing"
            );
        }
        while !orphans.is_empty() && report.repair_passes < self.config.max_enforcement_retries {
            report.repair_passes += 1;
            let repairs = plan_repairs(&planner, &proxies, &orphans);
            self.persist(repairs, &mut report)?;
            orphans = self.degree_index(tenant, &proxies)?.orphans();
        }

        report.orphans_remaining = orphans.len();
        report.duration_ms = elapsed_ms(start);

        if !orphans.is_empty() {
            warn!(
                tenant = %tenant,
                orphans = orphans.len(),
                repair_passes = report.repair_passes,
                "connectivity invariant still violated"
            );
            return Err(TopologyError::ConnectivityInvariantViolation {
                tenant: tenant.to_string(),
                orphans,
            });
        }

        info!(
            tenant = %tenant,
            proxies = report.proxies_scanned,
            created = report.total_created(),
            removed = report.total_removed(),
            fallbacks = report.coverage_fallbacks,
            repair_passes = report.repair_passes,
            duration_ms = report.duration_ms,
            "connectivity enforced"
        );
        Ok(report)
    }

    /// Degree-zero proxies of the tenant, in proxy order.
    pub fn orphans(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<String>> {
        let proxies = self.store.list_proxies(tenant)?;
        Ok(self.degree_index(tenant, &proxies)?.orphans())
    }

    pub fn connectivity_report(&self, tenant: &TenantShardKey) -> TopologyResult<ConnectivityReport> {
        let proxies = self.store.list_proxies(tenant)?;
        let domain = self.store.list_domain_edges(tenant)?;
        let bridging = self.store.list_bridging_edges(tenant)?;
        let mut incident = domain.clone();
        incident.extend(self.store.list_inbound_domain_edges(tenant)?);

        let mut bridging_by_type: BTreeMap<String, usize> = BTreeMap::new();
        for edge in &bridging {
            *bridging_by_type
                .entry(edge.connection_type.as_string())
                .or_default() += 1;
        }

        Ok(ConnectivityReport {
            tenant: Some(tenant.clone()),
            proxy_count: proxies.len(),
            domain_edge_count: domain.len(),
            bridging_edge_count: bridging.len(),
            bridging_by_type,
            orphans: DegreeIndex::build(&proxies, &incident, &bridging).orphans(),
            component_count: component_count(&proxies, &domain, &bridging),
        })
    }

    /// Drop every bridging edge of the tenant. Domain edges are untouched.
    pub fn clear_bridges(&self, tenant: &TenantShardKey) -> TopologyResult<usize> {
        let removed = self.store.delete_bridging_edges(tenant)?;
        info!(tenant = %tenant, removed, "bridging edges cleared");
        Ok(removed)
    }

    pub fn rebuild(&self, tenant: &TenantShardKey) -> TopologyResult<EnforcementReport> {
        self.clear_bridges(tenant)?;
        self.enforce(tenant)
    }

    /// Degrees over the tenant's own edges plus domain edges other tenants
    /// point at its shared-reference proxies.
    fn degree_index(
        &self,
        tenant: &TenantShardKey,
        proxies: &[ProxyVertex],
    ) -> TopologyResult<DegreeIndex> {
        let mut domain = self.store.list_domain_edges(tenant)?;
        domain.extend(self.store.list_inbound_domain_edges(tenant)?);
        let bridging = self.store.list_bridging_edges(tenant)?;
        Ok(DegreeIndex::build(proxies, &domain, &bridging))
    }

    /// Delete stored network and cross-domain bridges that this pass did not
    /// plan. Their endpoints were chosen by proxy position, which shifts when
    /// proxies are added. Temporal and repair edges are kept.
    fn prune_stale(
        &self,
        tenant: &TenantShardKey,
        planned_keys: &HashSet<String>,
        report: &mut EnforcementReport,
    ) -> TopologyResult<()> {
        let mut stale: Vec<String> = Vec::new();
        for edge in self.store.list_bridging_edges(tenant)? {
            let index_derived = matches!(
                edge.connection_type,
                BridgeType::ProxyNetwork(_) | BridgeType::CrossDomainProxy
            );
            if index_derived && !planned_keys.contains(&edge.bridge_key) {
                *report
                    .edges_removed
                    .entry(edge.connection_type.as_string())
                    .or_default() += 1;
                stale.push(edge.bridge_key);
            }
        }
        if stale.is_empty() {
            return Ok(());
        }
        let removed = self.store.delete_bridging_edges_by_key(tenant, &stale)?;
        debug!(tenant = %tenant, removed, "stale bridging edges pruned");
        Ok(())
    }

    /// Insert planned edges grouped by connection type and count new rows.
    fn persist(
        &self,
        planned: Vec<BridgingEdge>,
        report: &mut EnforcementReport,
    ) -> TopologyResult<()> {
        let mut groups: BTreeMap<String, Vec<BridgingEdge>> = BTreeMap::new();
        for edge in planned {
            groups
                .entry(edge.connection_type.as_string())
                .or_default()
                .push(edge);
        }
        for (connection_type, edges) in groups {
            let inserted = self.store.insert_bridging_edges(&edges)?;
            debug!(
                connection_type = %connection_type,
                planned = edges.len(),
                inserted,
                "bridging edges persisted"
            );
            if inserted > 0 {
                *report.edges_created.entry(connection_type).or_default() += inserted;
            }
        }
        Ok(())
    }
}

fn by_role(proxies: &[ProxyVertex], entity_type: EntityType, role: ProxyRole) -> Vec<&ProxyVertex> {
    proxies
        .iter()
        .filter(|p| p.entity_type == entity_type && p.role == role)
        .collect()
}

/// One repair edge per orphan: to its partner proxy when the tenant has it,
/// else to the first non-orphan proxy, else to the first other proxy.
/// A tenant with a single proxy cannot be repaired.
fn plan_repairs(
    planner: &BridgePlanner<'_>,
    proxies: &[ProxyVertex],
    orphans: &[String],
) -> Vec<BridgingEdge> {
    let by_id: HashMap<&str, &ProxyVertex> = proxies.iter().map(|p| (p.id.as_str(), p)).collect();
    let anchor = proxies.iter().find(|p| !orphans.contains(&p.id));

    orphans
        .iter()
        .filter_map(|orphan_id| {
            let orphan = *by_id.get(orphan_id.as_str())?;
            let partner_id = orphan.partner_id();
            let target = by_id
                .get(partner_id.as_str())
                .copied()
                .or(anchor)
                .or_else(|| proxies.iter().find(|p| p.id != orphan.id))?;
            Some(planner.orphan_repair(orphan, target))
        })
        .collect()
}

fn elapsed_ms(start: Instant) -> u32 {
    u32::try_from(start.elapsed().as_millis()).unwrap_or(u32::MAX)
}
