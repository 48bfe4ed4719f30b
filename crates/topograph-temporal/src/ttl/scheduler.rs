//! Background maintenance task: TTL sweep plus pending connectivity
//! enforcement, on a fixed interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::TopologyEngine;
use crate::wall_clock;

/// Handle to a running maintenance loop. Dropping it leaves the task
/// running; call [`SweepScheduler::shutdown`] to stop it.
pub struct SweepScheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
    runs: Arc<AtomicU64>,
}

impl SweepScheduler {
    /// Spawn on the current tokio runtime. The first run happens after one
    /// full `interval`. Engine work runs on the blocking pool.
    pub fn spawn(engine: Arc<TopologyEngine>, interval: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let runs = Arc::new(AtomicU64::new(0));
        let counter = runs.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let engine = engine.clone();
                let result =
                    tokio::task::spawn_blocking(move || engine.run_maintenance(wall_clock())).await;
                counter.fetch_add(1, Ordering::SeqCst);
                match result {
                    Ok(Ok(report)) => info!(
                        closed = report.sweep.closed,
                        tenants_enforced = report.tenants_enforced,
                        violations = report.violations,
                        "maintenance run complete"
                    ),
                    Ok(Err(e)) => warn!(error = %e, "maintenance run failed"),
                    Err(e) => warn!(error = %e, "maintenance task panicked"),
                }
            }
            info!("maintenance scheduler stopped");
        });

        Self {
            shutdown,
            handle,
            runs,
        }
    }

    /// Completed maintenance runs, successful or not.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Signal the loop and wait for it to exit. An in-flight run finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "maintenance scheduler join failed");
        }
    }
}
