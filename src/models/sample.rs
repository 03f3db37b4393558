// Per-axis vibration features and timestamped samples

use serde::{Deserialize, Serialize};

/// Spatial axis of the accelerometer; serializes to lowercase JSON ("x", "y", "z").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// Scalar features tracked per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    Rms,
    Kurtosis,
    PeakToPeak,
    CrestFactor,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Rms,
        Feature::Kurtosis,
        Feature::PeakToPeak,
        Feature::CrestFactor,
    ];

    /// Legend label for chart series.
    pub fn label(self) -> &'static str {
        match self {
            Feature::Rms => "RMS",
            Feature::Kurtosis => "Kurtosis",
            Feature::PeakToPeak => "PP",
            Feature::CrestFactor => "Crest Factor",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Feature::Rms => 0,
            Feature::Kurtosis => 1,
            Feature::PeakToPeak => 2,
            Feature::CrestFactor => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisReading {
    pub rms: f64,
    pub kurtosis: f64,
    pub peak_to_peak: f64,
    pub crest_factor: f64,
}

impl AxisReading {
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Rms => self.rms,
            Feature::Kurtosis => self.kurtosis,
            Feature::PeakToPeak => self.peak_to_peak,
            Feature::CrestFactor => self.crest_factor,
        }
    }

    /// Largest of the four feature values.
    pub fn peak(&self) -> f64 {
        Feature::ALL
            .iter()
            .map(|f| self.value(*f))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisFeatures {
    pub x: AxisReading,
    pub y: AxisReading,
    pub z: AxisReading,
}

impl AxisFeatures {
    pub fn axis(&self, axis: Axis) -> &AxisReading {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

/// One reading of all axes. Timestamp is wall-clock ms since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSample {
    pub timestamp: u64,
    #[serde(flatten)]
    pub features: AxisFeatures,
}
