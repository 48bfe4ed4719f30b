//! TtlExpirationEngine: closes live versions past their type's horizon.
//!
//! A sweep never inserts or deletes a version. Each candidate is closed
//! under its proxy's lock with a conditional update, so a version that was
//! superseded or already swept in the meantime is simply skipped.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use topograph_core::config::TtlConfig;
use topograph_core::errors::ErrorChain;
use topograph_core::models::{SweepFailure, SweepReport, VersionedEntity};
use topograph_core::traits::ITopologyStore;
use topograph_core::TopologyResult;

use crate::proxy::ProxyLocks;

pub struct TtlExpirationEngine {
    store: Arc<dyn ITopologyStore>,
    locks: Arc<ProxyLocks>,
    config: TtlConfig,
}

impl TtlExpirationEngine {
    pub fn new(store: Arc<dyn ITopologyStore>, locks: Arc<ProxyLocks>, config: TtlConfig) -> Self {
        Self {
            store,
            locks,
            config,
        }
    }

    pub fn config(&self) -> &TtlConfig {
        &self.config
    }

    /// Close every live version with `created + ttl <= now`.
    ///
    /// Only the candidate scan can fail the sweep. Per-version failures are
    /// collected into the report and the sweep moves on.
    pub fn sweep(&self, now: i64) -> TopologyResult<SweepReport> {
        let start = Instant::now();
        let mut candidates: Vec<(VersionedEntity, i64)> = Vec::new();
        for (entity_type, ttl) in self.config.horizons() {
            let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
            let cutoff = now.saturating_sub(ttl);
            let due = self.store.live_versions_due(entity_type, cutoff)?;
            debug!(entity_type = %entity_type, cutoff, due = due.len(), "ttl candidates");
            candidates.extend(due.into_iter().map(|v| (v, cutoff)));
        }

        let mut report = SweepReport {
            now,
            scanned: candidates.len() as u64,
            ..SweepReport::default()
        };
        let mut errors = ErrorChain::new();

        for (step, (version, cutoff)) in candidates.iter().enumerate() {
            let outcome = self.locks.with_lock(&version.proxy_id, || {
                self.store
                    .close_if_due(&version.tenant, &version.id, now, *cutoff)
            });
            match outcome {
                Ok(true) => {
                    report.closed += 1;
                    debug!(
                        tenant = %version.tenant,
                        proxy_id = %version.proxy_id,
                        version_id = %version.id,
                        "version expired"
                    );
                }
                Ok(false) => report.skipped += 1,
                Err(e) => errors.push(step, version.id.clone(), e),
            }
        }

        for failure in errors.into_vec() {
            let proxy_id = candidates
                .get(failure.step)
                .map(|(v, _)| v.proxy_id.clone())
                .unwrap_or_default();
            warn!(
                proxy_id = %proxy_id,
                version_id = %failure.subject,
                error = %failure.error,
                "ttl close failed"
            );
            report.failures.push(SweepFailure {
                proxy_id,
                version_id: failure.subject,
                reason: failure.error.to_string(),
            });
        }
        report.failed = report.failures.len() as u64;
        report.duration_ms = u32::try_from(start.elapsed().as_millis()).unwrap_or(u32::MAX);

        info!(
            now,
            scanned = report.scanned,
            closed = report.closed,
            skipped = report.skipped,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "ttl sweep complete"
        );
        Ok(report)
    }
}
