// Inbound telemetry feed wire format

use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};

use super::{AxisFeatures, AxisReading, NORMAL_FAULT, StatusSnapshot, UNKNOWN_CONFIDENCE};

/// Feature values for one axis as sent by the feed. Every field is optional;
/// absent, null or non-numeric values read as 0.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureValues {
    #[serde(default, deserialize_with = "lenient_number")]
    pub rms: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub kurtosis: Option<f64>,
    #[serde(
        default,
        alias = "pp",
        alias = "peek-to-peek",
        deserialize_with = "lenient_number"
    )]
    pub peak_to_peak: Option<f64>,
    #[serde(default, alias = "crestf", deserialize_with = "lenient_number")]
    pub crest_factor: Option<f64>,
}

impl FeatureValues {
    pub fn reading(&self) -> AxisReading {
        AxisReading {
            rms: self.rms.unwrap_or(0.0),
            kurtosis: self.kurtosis.unwrap_or(0.0),
            peak_to_peak: self.peak_to_peak.unwrap_or(0.0),
            crest_factor: self.crest_factor.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AxisFeatureValues {
    #[serde(default)]
    pub x: Option<FeatureValues>,
    #[serde(default)]
    pub y: Option<FeatureValues>,
    #[serde(default)]
    pub z: Option<FeatureValues>,
}

impl AxisFeatureValues {
    pub fn readings(&self) -> AxisFeatures {
        let read = |v: &Option<FeatureValues>| {
            v.as_ref().map(FeatureValues::reading).unwrap_or_default()
        };
        AxisFeatures {
            x: read(&self.x),
            y: read(&self.y),
            z: read(&self.z),
        }
    }
}

/// Latest status and features for one machine. Status fields of the wrong
/// type read as absent so they fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub predicted_fault: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub confidence: Option<String>,
    /// Sub-model verdicts; non-string verdicts are dropped.
    #[serde(default, deserialize_with = "lenient_verdicts")]
    pub models: BTreeMap<String, String>,
    #[serde(default)]
    pub graph_value: Option<AxisFeatureValues>,
    #[serde(default)]
    pub features: Option<AxisFeatureValues>,
}

impl FeedEntry {
    /// Per-axis readings; `graph_value` wins over `features` when both are sent.
    pub fn readings(&self) -> AxisFeatures {
        self.graph_value
            .as_ref()
            .or(self.features.as_ref())
            .map(AxisFeatureValues::readings)
            .unwrap_or_default()
    }

    pub fn status(&self) -> StatusSnapshot {
        let predicted_fault = self
            .predicted_fault
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(NORMAL_FAULT);
        let confidence = self
            .confidence
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_CONFIDENCE);
        StatusSnapshot::new(
            predicted_fault,
            confidence,
            self.models.clone(),
            self.readings(),
        )
    }
}

/// One poll of the feed: entries in wire order, plus ids whose entry could not be read.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    entries: Vec<(String, FeedEntry)>,
    malformed: HashSet<String>,
}

impl FeedSnapshot {
    /// Parses a feed body. The body must be a JSON object; an entry that fails to
    /// decode is logged and recorded as malformed without affecting the others.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)?;
        let mut snapshot = FeedSnapshot::default();
        for (id, value) in raw {
            match serde_json::from_value::<FeedEntry>(value) {
                Ok(entry) => snapshot.entries.push((id, entry)),
                Err(e) => {
                    tracing::warn!(
                        machine_id = %id,
                        error = %e,
                        operation = "parse_feed_entry",
                        "skipping malformed feed entry"
                    );
                    snapshot.malformed.insert(id);
                }
            }
        }
        Ok(snapshot)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, FeedEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            malformed: HashSet::new(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FeedEntry)> {
        self.entries.iter().map(|(id, e)| (id.as_str(), e))
    }

    pub fn get(&self, id: &str) -> Option<&FeedEntry> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, e)| e)
    }

    pub fn is_malformed(&self, id: &str) -> bool {
        self.malformed.contains(id)
    }

    /// True when the feed reported `id` this cycle, readable or not.
    pub fn reports(&self, id: &str) -> bool {
        self.is_malformed(id) || self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_verdicts<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Object(map)) = value else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(name, verdict)| match verdict {
            serde_json::Value::String(v) => Some((name, v)),
            _ => None,
        })
        .collect())
}
