// Fault status snapshot and its display tag

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AxisFeatures;

pub const NORMAL_FAULT: &str = "normal";
pub const HIGH_CONFIDENCE: &str = "high";
pub const UNKNOWN_CONFIDENCE: &str = "unknown";

/// Sub-models whose verdicts the feed reports.
pub const MODEL_NAMES: [&str; 3] = ["gnb", "knn", "svm"];

/// Card status: healthy (green), suspect (amber) or fault (red).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    Healthy,
    Suspect,
    Fault,
}

impl StatusTag {
    /// `normal` is healthy regardless of confidence; any other fault is a
    /// confirmed fault only at high confidence.
    pub fn classify(predicted_fault: &str, confidence: &str) -> Self {
        if predicted_fault.eq_ignore_ascii_case(NORMAL_FAULT) {
            StatusTag::Healthy
        } else if confidence.eq_ignore_ascii_case(HIGH_CONFIDENCE) {
            StatusTag::Fault
        } else {
            StatusTag::Suspect
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub predicted_fault: String,
    pub confidence: String,
    pub models: BTreeMap<String, String>,
    pub features: AxisFeatures,
    pub tag: StatusTag,
}

impl StatusSnapshot {
    pub fn new(
        predicted_fault: impl Into<String>,
        confidence: impl Into<String>,
        models: BTreeMap<String, String>,
        features: AxisFeatures,
    ) -> Self {
        let predicted_fault = predicted_fault.into();
        let confidence = confidence.into();
        let tag = StatusTag::classify(&predicted_fault, &confidence);
        Self {
            predicted_fault,
            confidence,
            models,
            features,
            tag,
        }
    }

    /// Status of a freshly added machine: normal, high confidence, all models normal, zeroed features.
    pub fn baseline() -> Self {
        let models = MODEL_NAMES
            .iter()
            .map(|name| (name.to_string(), NORMAL_FAULT.to_string()))
            .collect();
        Self::new(
            NORMAL_FAULT,
            HIGH_CONFIDENCE,
            models,
            AxisFeatures::default(),
        )
    }
}
