// Background loops: feed refresh (fetch + merge) and chart refresh.
// Each loop owns a shutdown receiver and exits as soon as it fires, including
// while a fetch is in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;
use tokio::time::{Duration, interval};
use tracing::{debug, info, instrument, warn};

use crate::service::MonitorService;

/// Shared handles the poller reads and the channel that stops it.
pub struct PollerDeps {
    pub service: Arc<MonitorService>,
    /// Open WebSocket connections, reported in the stats line.
    pub ws_connections: Arc<AtomicUsize>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Poller timing and logging config.
pub struct PollerConfig {
    pub refresh_interval_ms: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Spawns the refresh loop. The first refresh runs immediately. A fetch that
/// outlasts the interval delays the next one (missed ticks are skipped), so
/// fetches never overlap.
pub fn spawn_poller(deps: PollerDeps, config: PollerConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run_poller(deps, config).await;
    })
}

#[instrument(skip_all, fields(refresh_interval_ms = config.refresh_interval_ms))]
async fn run_poller(deps: PollerDeps, config: PollerConfig) {
    let PollerDeps {
        service,
        ws_connections,
        mut shutdown_rx,
    } = deps;
    let mut tick = interval(Duration::from_millis(config.refresh_interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut stats_log_tick = interval(Duration::from_secs(config.stats_log_interval_secs));
    stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick completes immediately; no stats line at startup.
    stats_log_tick.tick().await;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                tokio::select! {
                    _ = service.refresh() => {}
                    _ = &mut shutdown_rx => {
                        debug!("Poller shutting down mid-refresh");
                        break;
                    }
                }
            }
            _ = &mut shutdown_rx => {
                debug!("Poller shutting down");
                break;
            }
            _ = stats_log_tick.tick() => {
                let machines = service.machine_count().await;
                let stats = service.stats();
                info!(
                    machines,
                    ws_connections = ws_connections.load(Ordering::Relaxed),
                    refreshes_ok = stats.refreshes_ok.load(Ordering::Relaxed),
                    refreshes_failed = stats.refreshes_failed.load(Ordering::Relaxed),
                    signals_failed = stats.signals_failed.load(Ordering::Relaxed),
                    "app stats"
                );
            }
        }
    }
}

/// Spawns the chart loop: every `refresh_interval_ms` the selected machine's
/// latest sample is pushed into the rolling window. Never touches the network.
pub fn spawn_chart_ticker(
    service: Arc<MonitorService>,
    refresh_interval_ms: u64,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(refresh_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    service.chart_tick(now_ms()).await;
                }
                _ = &mut shutdown_rx => {
                    debug!("Chart ticker shutting down");
                    break;
                }
            }
        }
    })
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            warn!(
                error = %e,
                operation = "get_timestamp",
                "system time error"
            );
            0
        })
}
