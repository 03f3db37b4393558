// Owns the dashboard state: runs feed I/O, commits reducer transitions and
// publishes the results to subscribers.

use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::aggregator::{
    AggregatorError, AggregatorSettings, ChartFeed, ChartView, DashboardState, DashboardView,
};
use crate::feed_client::{MachineRegistration, TelemetryFeed};
use crate::models::{Axis, FaultScenario, Machine, MachineDraft};

/// Counters for the periodic stats log.
#[derive(Debug, Default)]
pub struct RefreshStats {
    pub refreshes_ok: AtomicU64,
    pub refreshes_failed: AtomicU64,
    pub signals_failed: AtomicU64,
}

pub struct MonitorService {
    feed: Arc<dyn TelemetryFeed>,
    state: RwLock<DashboardState>,
    chart: RwLock<ChartFeed>,
    views_tx: broadcast::Sender<DashboardView>,
    chart_tx: broadcast::Sender<ChartView>,
    stats: Arc<RefreshStats>,
}

impl MonitorService {
    pub fn new(
        feed: Arc<dyn TelemetryFeed>,
        settings: AggregatorSettings,
        chart_retention_ms: u64,
        broadcast_capacity: usize,
    ) -> Self {
        let (views_tx, _) = broadcast::channel(broadcast_capacity);
        let (chart_tx, _) = broadcast::channel(broadcast_capacity);
        Self {
            feed,
            state: RwLock::new(DashboardState::new(settings)),
            chart: RwLock::new(ChartFeed::new(chart_retention_ms)),
            views_tx,
            chart_tx,
            stats: Arc::new(RefreshStats::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardView> {
        self.views_tx.subscribe()
    }

    pub fn subscribe_chart(&self) -> broadcast::Receiver<ChartView> {
        self.chart_tx.subscribe()
    }

    pub fn stats(&self) -> &RefreshStats {
        &self.stats
    }

    pub async fn view(&self) -> DashboardView {
        self.state.read().await.view()
    }

    pub async fn machine(&self, id: &str) -> Option<Machine> {
        self.state.read().await.machine(id).cloned()
    }

    pub async fn machine_count(&self) -> usize {
        self.state.read().await.len()
    }

    /// One fetch-and-merge cycle. A failed fetch leaves the state untouched.
    /// Returns whether the state was updated.
    pub async fn refresh(&self) -> bool {
        let snapshot = match self.feed.fetch_snapshot().await {
            Ok(s) => s,
            Err(e) => {
                self.stats.refreshes_failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, operation = "fetch_snapshot", "feed refresh failed");
                return false;
            }
        };
        let view = {
            let mut state = self.state.write().await;
            let next = state.merge(&snapshot, Utc::now());
            *state = next;
            state.view()
        };
        self.stats.refreshes_ok.fetch_add(1, Ordering::Relaxed);
        debug!(
            operation = "merge",
            fed = snapshot.len(),
            machines = view.machines.len(),
            "feed snapshot merged"
        );
        self.publish(view);
        true
    }

    /// Registers the machine upstream and adds it locally. Registration failure
    /// is logged; the machine is kept with a locally minted id.
    pub async fn add_machine(&self, draft: MachineDraft) -> Result<Machine, AggregatorError> {
        if draft.name.trim().is_empty() {
            return Err(AggregatorError::EmptyName);
        }
        let now = Utc::now();
        let registration = MachineRegistration {
            name: draft.name.trim().to_string(),
            category: draft.category_or_default().to_string(),
            location: draft.location_or_default().to_string(),
            last_maintenance: now.format("%Y-%m-%d").to_string(),
        };
        let count = self.machine_count().await + 1;
        let assigned_id = match self.feed.register_machine(count, &registration).await {
            Ok(id) => id,
            Err(e) => {
                self.stats.signals_failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    operation = "register_machine",
                    "machine registration failed; keeping local machine"
                );
                None
            }
        };

        let (machine, view) = {
            let mut state = self.state.write().await;
            let (next, machine) = state.add_local(&draft, assigned_id, now)?;
            *state = next;
            (machine, state.view())
        };
        info!(machine_id = %machine.id, name = %machine.name, "machine added");
        self.publish(view);
        Ok(machine)
    }

    /// Removes the machine locally, then tells upstream the new count without waiting.
    pub async fn remove_machine(&self, id: &str) -> Result<(), AggregatorError> {
        let (count, view) = {
            let mut state = self.state.write().await;
            let next = state.remove_local(id)?;
            *state = next;
            (state.len(), state.view())
        };
        info!(machine_id = %id, "machine removed");
        self.publish(view);

        let feed = self.feed.clone();
        let stats = self.stats.clone();
        tokio::spawn(async move {
            if let Err(e) = feed.post_machine_count(count).await {
                stats.signals_failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    operation = "post_machine_count",
                    count,
                    "machine count update failed"
                );
            }
        });
        Ok(())
    }

    pub async fn select(&self, id: &str, axis: Axis) -> Result<(), AggregatorError> {
        self.transition(|s| s.select(id, axis)).await
    }

    pub async fn set_axis(&self, axis: Axis) -> Result<(), AggregatorError> {
        self.transition(|s| s.set_axis(axis)).await
    }

    pub async fn clear_selection(&self) {
        let view = {
            let mut state = self.state.write().await;
            *state = state.clear_selection();
            state.view()
        };
        self.publish(view);
    }

    /// Records the scenario for the selected machine and forwards it upstream without waiting.
    pub async fn set_test_input(&self, scenario: FaultScenario) -> Result<(), AggregatorError> {
        let (machine_id, view) = {
            let mut state = self.state.write().await;
            let next = state.set_test_input(scenario)?;
            *state = next;
            let machine_id = state
                .selection()
                .map(|s| s.machine_id.clone())
                .ok_or(AggregatorError::NoSelection)?;
            (machine_id, state.view())
        };
        self.publish(view);

        let feed = self.feed.clone();
        let stats = self.stats.clone();
        tokio::spawn(async move {
            if let Err(e) = feed.post_test_input(scenario, &machine_id).await {
                stats.signals_failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    operation = "post_test_input",
                    machine_id = %machine_id,
                    "test input update failed"
                );
            }
        });
        Ok(())
    }

    /// Feeds the selected machine's latest sample into the chart window. No network I/O.
    pub async fn chart_tick(&self, now_ms: u64) -> bool {
        let (selection, latest, peak) = {
            let state = self.state.read().await;
            let latest = state
                .selected_machine()
                .and_then(|m| m.history.latest().copied());
            (state.selection().cloned(), latest, selected_peak(&state))
        };
        let (appended, view) = {
            let mut chart = self.chart.write().await;
            let appended = chart.tick(now_ms, selection.as_ref(), latest.as_ref());
            (appended, chart.view(peak))
        };
        if appended && self.chart_tx.send(view).is_err() {
            debug!(operation = "broadcast_chart", "no chart subscribers");
        }
        appended
    }

    pub async fn chart_view(&self) -> ChartView {
        let peak = selected_peak(&*self.state.read().await);
        self.chart.read().await.view(peak)
    }

    async fn transition<F>(&self, f: F) -> Result<(), AggregatorError>
    where
        F: FnOnce(&DashboardState) -> Result<DashboardState, AggregatorError>,
    {
        let view = {
            let mut state = self.state.write().await;
            let next = f(&*state)?;
            *state = next;
            state.view()
        };
        self.publish(view);
        Ok(())
    }

    fn publish(&self, view: DashboardView) {
        if self.views_tx.send(view).is_err() {
            debug!(operation = "broadcast_view", "no dashboard subscribers");
        }
    }
}

/// Largest history value on the selected axis of the selected machine.
fn selected_peak(state: &DashboardState) -> f64 {
    match (state.selected_machine(), state.selection()) {
        (Some(m), Some(s)) => m.history.peak(s.axis),
        _ => 0.0,
    }
}
