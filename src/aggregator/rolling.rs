// Time-windowed chart buffers for the selected machine and axis

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::Selection;
use crate::models::{AxisReading, Feature, FeatureSample};

pub const DEFAULT_RETENTION_MS: u64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Tick time, ms since the Unix epoch.
    pub t: u64,
    pub value: f64,
}

/// One point buffer per feature. Buffers only ever hold points newer than
/// `retention_ms` before the latest tick.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    retention_ms: u64,
    series: [VecDeque<ChartPoint>; 4],
}

impl RollingWindow {
    pub fn new(retention_ms: u64) -> Self {
        Self {
            retention_ms,
            series: Default::default(),
        }
    }

    pub fn retention_ms(&self) -> u64 {
        self.retention_ms
    }

    /// Appends one point per feature at `now_ms`, then evicts points at or before
    /// `now_ms - retention_ms`. Without a reading the tick does nothing.
    pub fn tick(&mut self, now_ms: u64, latest: Option<&AxisReading>) -> bool {
        let Some(reading) = latest else {
            return false;
        };
        for feature in Feature::ALL {
            self.series[feature.index()].push_back(ChartPoint {
                t: now_ms,
                value: reading.value(feature),
            });
        }
        self.evict(now_ms);
        true
    }

    pub fn points(&self, feature: Feature) -> impl Iterator<Item = &ChartPoint> {
        self.series[feature.index()].iter()
    }

    pub fn len(&self, feature: Feature) -> usize {
        self.series[feature.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(VecDeque::is_empty)
    }

    pub fn clear(&mut self) {
        self.series.iter_mut().for_each(VecDeque::clear);
    }

    fn evict(&mut self, now_ms: u64) {
        let Some(cutoff) = now_ms.checked_sub(self.retention_ms) else {
            return;
        };
        for series in &mut self.series {
            while series.front().is_some_and(|p| p.t <= cutoff) {
                series.pop_front();
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub feature: Feature,
    pub label: &'static str,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub selection: Option<Selection>,
    pub retention_ms: u64,
    /// Upper y-axis hint: 10% above the largest value in the selected machine's history.
    pub suggested_max: f64,
    pub series: Vec<ChartSeries>,
}

/// Rolling window bound to a selection; switching machine or axis starts a fresh window.
#[derive(Debug, Clone)]
pub struct ChartFeed {
    window: RollingWindow,
    bound_to: Option<Selection>,
}

impl ChartFeed {
    pub fn new(retention_ms: u64) -> Self {
        Self {
            window: RollingWindow::new(retention_ms),
            bound_to: None,
        }
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    /// Feeds the latest sample of the selected machine. Returns whether points were appended.
    pub fn tick(
        &mut self,
        now_ms: u64,
        selection: Option<&Selection>,
        latest: Option<&FeatureSample>,
    ) -> bool {
        if self.bound_to.as_ref() != selection {
            self.window.clear();
            self.bound_to = selection.cloned();
        }
        let Some(selection) = selection else {
            return false;
        };
        let reading = latest.map(|s| s.features.axis(selection.axis));
        self.window.tick(now_ms, reading)
    }

    pub fn view(&self, history_peak: f64) -> ChartView {
        ChartView {
            selection: self.bound_to.clone(),
            retention_ms: self.window.retention_ms(),
            suggested_max: history_peak * 1.1,
            series: Feature::ALL
                .iter()
                .map(|f| ChartSeries {
                    feature: *f,
                    label: f.label(),
                    points: self.window.points(*f).copied().collect(),
                })
                .collect(),
        }
    }
}
