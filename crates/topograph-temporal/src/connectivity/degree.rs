//! Explicit degree index over domain ∪ bridging edges.
//!
//! `hasVersion` edges are deliberately absent: a proxy reachable only
//! through its own history is still an orphan in the topology.

use std::collections::HashMap;

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};

use topograph_core::models::{BridgingEdge, DomainEdge, ProxyVertex};

/// Undirected degree per proxy of one tenant. Edge endpoints outside the
/// tenant's proxy set are ignored.
pub struct DegreeIndex {
    order: Vec<String>,
    degrees: HashMap<String, usize>,
}

impl DegreeIndex {
    pub fn new(proxies: &[ProxyVertex]) -> Self {
        Self {
            order: proxies.iter().map(|p| p.id.clone()).collect(),
            degrees: proxies.iter().map(|p| (p.id.clone(), 0)).collect(),
        }
    }

    pub fn build(proxies: &[ProxyVertex], domain: &[DomainEdge], bridging: &[BridgingEdge]) -> Self {
        let mut index = Self::new(proxies);
        for e in domain {
            index.record(&e.from_proxy, &e.to_proxy);
        }
        for e in bridging {
            index.record(&e.from_proxy, &e.to_proxy);
        }
        index
    }

    pub fn record(&mut self, from: &str, to: &str) {
        for end in [from, to] {
            if let Some(d) = self.degrees.get_mut(end) {
                *d += 1;
            }
        }
    }

    pub fn degree(&self, proxy_id: &str) -> usize {
        self.degrees.get(proxy_id).copied().unwrap_or(0)
    }

    /// Degree-zero proxies in the index's deterministic order.
    pub fn orphans(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.degree(id) == 0)
            .cloned()
            .collect()
    }
}

/// Connected components of the tenant graph. Isolated proxies count as one
/// component each.
pub fn component_count(
    proxies: &[ProxyVertex],
    domain: &[DomainEdge],
    bridging: &[BridgingEdge],
) -> usize {
    let mut graph: UnGraph<(), ()> = UnGraph::with_capacity(proxies.len(), domain.len() + bridging.len());
    let nodes: HashMap<&str, NodeIndex> = proxies
        .iter()
        .map(|p| (p.id.as_str(), graph.add_node(())))
        .collect();

    let ends = domain
        .iter()
        .map(|e| (e.from_proxy.as_str(), e.to_proxy.as_str()))
        .chain(bridging.iter().map(|e| (e.from_proxy.as_str(), e.to_proxy.as_str())));
    for (from, to) in ends {
        if let (Some(&a), Some(&b)) = (nodes.get(from), nodes.get(to)) {
            graph.add_edge(a, b, ());
        }
    }
    connected_components(&graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use topograph_core::models::{BridgeType, EntityType, ProxyRole, TenantShardKey};

    fn proxies(n: usize) -> Vec<ProxyVertex> {
        let t = TenantShardKey::new("acme").unwrap();
        (0..n)
            .map(|i| ProxyVertex::new(t.clone(), EntityType::Software, i.to_string(), ProxyRole::In, 0))
            .collect()
    }

    fn bridge(from: &str, to: &str) -> BridgingEdge {
        BridgingEdge {
            bridge_key: format!("{from}->{to}"),
            tenant: TenantShardKey::new("acme").unwrap(),
            connection_type: BridgeType::OrphanFallback,
            from_proxy: from.into(),
            to_proxy: to.into(),
            attributes: serde_json::json!({}),
            created_at: 0,
        }
    }

    #[test]
    fn orphans_and_components() {
        let ps = proxies(4);
        let edges = vec![
            bridge(&ps[0].id, &ps[1].id),
            bridge(&ps[1].id, "software_proxy_in/elsewhere"),
        ];
        let index = DegreeIndex::build(&ps, &[], &edges);
        assert_eq!(index.degree(&ps[1].id), 2);
        assert_eq!(index.orphans(), vec![ps[2].id.clone(), ps[3].id.clone()]);
        assert_eq!(component_count(&ps, &[], &edges), 3);
    }
}
