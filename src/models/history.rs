// Count-capped sample history

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

use super::{Axis, FeatureSample};

/// Insertion-ordered samples for one machine. Never longer than `cap`; the
/// oldest sample is evicted first.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    samples: VecDeque<FeatureSample>,
    cap: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_cap(Self::DEFAULT_CAP)
    }
}

impl History {
    pub const DEFAULT_CAP: usize = 50;

    /// A cap of zero is treated as one.
    pub fn with_cap(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            samples: VecDeque::with_capacity(cap + 1),
            cap,
        }
    }

    pub fn push(&mut self, sample: FeatureSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.cap {
            self.samples.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&FeatureSample> {
        self.samples.back()
    }

    pub fn first(&self) -> Option<&FeatureSample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureSample> {
        self.samples.iter()
    }

    /// Largest feature value seen on `axis` across the retained samples, or 0 when empty.
    pub fn peak(&self, axis: Axis) -> f64 {
        self.samples
            .iter()
            .map(|s| s.features.axis(axis).peak())
            .fold(0.0, f64::max)
    }
}

impl Serialize for History {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.samples.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AxisFeatures;

    fn sample(timestamp: u64) -> FeatureSample {
        FeatureSample {
            timestamp,
            features: AxisFeatures::default(),
        }
    }

    #[test]
    fn push_beyond_cap_drops_oldest() {
        let mut history = History::with_cap(50);
        for t in 0..50 {
            history.push(sample(t));
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.first().map(|s| s.timestamp), Some(0));

        history.push(sample(50));
        assert_eq!(history.len(), 50);
        assert_eq!(history.first().map(|s| s.timestamp), Some(1));
        assert_eq!(history.latest().map(|s| s.timestamp), Some(50));
    }

    #[test]
    fn zero_cap_keeps_latest_sample() {
        let mut history = History::with_cap(0);
        history.push(sample(1));
        history.push(sample(2));
        assert_eq!(history.cap(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().map(|s| s.timestamp), Some(2));
    }

    #[test]
    fn peak_scans_all_features_on_axis() {
        let mut history = History::with_cap(5);
        let mut s = sample(1);
        s.features.y.crest_factor = 4.5;
        s.features.x.rms = 9.0;
        history.push(s);
        assert_eq!(history.peak(Axis::Y), 4.5);
        assert_eq!(history.peak(Axis::Z), 0.0);
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut history = History::with_cap(2);
        history.push(sample(7));
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json[0]["timestamp"], 7);
        assert!(json[0]["x"]["peakToPeak"].is_number());
    }
}
