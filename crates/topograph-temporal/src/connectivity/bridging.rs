//! Pure planners for the bridging passes. Nothing here touches storage.
//!
//! Every planned edge carries a deterministic `bridge_key`, so the same
//! inputs always yield the same edge set and re-inserting it is a no-op.

use topograph_core::config::ConnectivityConfig;
use topograph_core::models::{
    BridgeType, BridgingEdge, EntityType, ProxyRole, ProxyVertex, TenantShardKey,
    VersionedEntity,
};

/// blake3 over the edge's identity fields, hex encoded.
pub fn bridge_key(
    tenant: &TenantShardKey,
    connection_type: BridgeType,
    from_proxy: &str,
    to_proxy: &str,
    discriminator: &str,
) -> String {
    let type_name = connection_type.as_string();
    let mut hasher = blake3::Hasher::new();
    for part in [
        tenant.as_str(),
        type_name.as_str(),
        from_proxy,
        to_proxy,
        discriminator,
    ] {
        hasher.update(part.as_bytes());
        hasher.update(&[0x1f]);
    }
    hasher.finalize().to_hex().to_string()
}

/// One `out[i] → in[j]` pair of the domain-internal pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkPair {
    pub out_index: usize,
    pub in_index: usize,
    /// Added by the coverage check rather than the modulus rule.
    pub fallback: bool,
}

/// `(i + j) mod k` coverage over `n` Out and `m` In proxies.
///
/// Pairs `(i, i)` and every `(i, j)` with `(i + j) % k == 0`, then adds a
/// direct fallback for each Out or In index the rule left uncovered. Every
/// index in `0..n` and `0..m` appears in at least one pair when both are
/// non-zero.
pub fn modulus_pairs(n: usize, m: usize, k: usize) -> Vec<NetworkPair> {
    let mut plan = PairPlan {
        pairs: Vec::new(),
        out_covered: vec![false; n],
        in_covered: vec![false; m],
    };
    if n == 0 || m == 0 || k == 0 {
        return plan.pairs;
    }

    for i in 0..n {
        if i < m {
            plan.push(i, i, false);
        }
        // Smallest j >= 0 with (i + j) % k == 0, then every k-th.
        let mut j = (k - i % k) % k;
        while j < m {
            if j != i {
                plan.push(i, j, false);
            }
            j += k;
        }
    }

    for i in 0..n {
        if !plan.out_covered[i] {
            plan.push(i, i % m, true);
        }
    }
    for j in 0..m {
        if !plan.in_covered[j] {
            plan.push(j % n, j, true);
        }
    }
    plan.pairs
}

struct PairPlan {
    pairs: Vec<NetworkPair>,
    out_covered: Vec<bool>,
    in_covered: Vec<bool>,
}

impl PairPlan {
    fn push(&mut self, out_index: usize, in_index: usize, fallback: bool) {
        self.out_covered[out_index] = true;
        self.in_covered[in_index] = true;
        self.pairs.push(NetworkPair {
            out_index,
            in_index,
            fallback,
        });
    }
}

/// Builds bridging edges stamped with one tenant, timestamp and the
/// configured synthetic attributes.
pub struct BridgePlanner<'a> {
    tenant: &'a TenantShardKey,
    config: &'a ConnectivityConfig,
    created_at: i64,
}

impl<'a> BridgePlanner<'a> {
    pub fn new(tenant: &'a TenantShardKey, config: &'a ConnectivityConfig, created_at: i64) -> Self {
        Self {
            tenant,
            config,
            created_at,
        }
    }

    fn edge(
        &self,
        connection_type: BridgeType,
        from_proxy: &str,
        to_proxy: &str,
        discriminator: &str,
        extra: serde_json::Value,
    ) -> BridgingEdge {
        let mut attributes = serde_json::json!({
            "synthetic": true,
            "bandwidth_mbps": self.config.nominal_bandwidth_mbps,
            "latency_ms": self.config.nominal_latency_ms,
        });
        if let (Some(base), serde_json::Value::Object(extra)) = (attributes.as_object_mut(), extra)
        {
            base.extend(extra);
        }
        BridgingEdge {
            bridge_key: bridge_key(self.tenant, connection_type, from_proxy, to_proxy, discriminator),
            tenant: self.tenant.clone(),
            connection_type,
            from_proxy: from_proxy.to_string(),
            to_proxy: to_proxy.to_string(),
            attributes,
            created_at: self.created_at,
        }
    }

    /// One `ProxyOut → ProxyIn` edge per consecutive version pair.
    /// `versions` must be ordered by `(proxy_id, created)`.
    pub fn temporal_sequence(&self, versions: &[VersionedEntity]) -> Vec<BridgingEdge> {
        versions
            .windows(2)
            .filter(|w| w[0].proxy_id == w[1].proxy_id)
            .map(|w| {
                let (prev, next) = (&w[0], &w[1]);
                let proxy_out = ProxyVertex::make_id(prev.entity_type, &prev.external_id, ProxyRole::Out);
                self.edge(
                    BridgeType::TemporalSequence,
                    &proxy_out,
                    &prev.proxy_id,
                    &format!("{}>{}", prev.id, next.id),
                    serde_json::json!({
                        "from_version": prev.id,
                        "to_version": next.id,
                    }),
                )
            })
            .collect()
    }

    /// Domain-internal `{domain}_proxy_network` edges. Returns the edges and
    /// how many of them came from the coverage fallback.
    pub fn domain_network(
        &self,
        domain: EntityType,
        outs: &[&ProxyVertex],
        ins: &[&ProxyVertex],
    ) -> (Vec<BridgingEdge>, usize) {
        let connection_type = BridgeType::ProxyNetwork(domain);
        let pairs = modulus_pairs(outs.len(), ins.len(), self.config.modulus);
        let fallbacks = pairs.iter().filter(|p| p.fallback).count();
        let edges = pairs
            .into_iter()
            .map(|p| {
                let extra = if p.fallback {
                    serde_json::json!({ "fallback": true })
                } else {
                    serde_json::json!({})
                };
                self.edge(
                    connection_type,
                    &outs[p.out_index].id,
                    &ins[p.in_index].id,
                    "",
                    extra,
                )
            })
            .collect();
        (edges, fallbacks)
    }

    /// `a.out[i] → b.out[i]` for `i < min(len)`.
    pub fn cross_domain(&self, a_outs: &[&ProxyVertex], b_outs: &[&ProxyVertex]) -> Vec<BridgingEdge> {
        a_outs
            .iter()
            .zip(b_outs.iter())
            .map(|(a, b)| {
                self.edge(
                    BridgeType::CrossDomainProxy,
                    &a.id,
                    &b.id,
                    "",
                    serde_json::json!({
                        "from_domain": a.entity_type.as_str(),
                        "to_domain": b.entity_type.as_str(),
                    }),
                )
            })
            .collect()
    }

    /// Repair edge for an orphan. Partners are joined `Out → In`; any other
    /// target is joined `orphan → target`.
    pub fn orphan_repair(&self, orphan: &ProxyVertex, target: &ProxyVertex) -> BridgingEdge {
        let is_partner = orphan.partner_id() == target.id;
        let (from, to) = if is_partner && orphan.role == ProxyRole::In {
            (target, orphan)
        } else {
            (orphan, target)
        };
        self.edge(
            BridgeType::OrphanFallback,
            &from.id,
            &to.id,
            "",
            serde_json::json!({ "orphan": orphan.id, "partner": is_partner }),
        )
    }
}
