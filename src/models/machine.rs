// Monitored machine, add-machine draft and test-input scenarios

use serde::{Deserialize, Serialize};

use super::{History, StatusSnapshot};

pub const DEFAULT_CATEGORY: &str = "Conveyor";
pub const DEFAULT_LOCATION: &str = "Floor 1";

/// Where a machine entered the dashboard. A local machine becomes `Feed` the
/// first time the feed reports its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Feed,
    Local,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub location: String,
    /// Last-service date, `YYYY-MM-DD`.
    pub last_service: String,
    pub status: StatusSnapshot,
    pub history: History,
    pub origin: Origin,
    /// Consecutive refreshes the feed has omitted this machine.
    pub missed_cycles: u32,
}

impl Machine {
    /// First sighting of `id` in the feed: default name, category and location.
    pub fn discovered(id: &str, today: &str, history_cap: usize) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Machine {}", id),
            category: DEFAULT_CATEGORY.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            last_service: today.to_string(),
            status: StatusSnapshot::baseline(),
            history: History::with_cap(history_cap),
            origin: Origin::Feed,
            missed_cycles: 0,
        }
    }
}

/// User input for adding a machine. Only `name` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", alias = "category")]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl MachineDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn category_or_default(&self) -> &str {
        non_blank(self.category.as_deref()).unwrap_or(DEFAULT_CATEGORY)
    }

    pub fn location_or_default(&self) -> &str {
        non_blank(self.location.as_deref()).unwrap_or(DEFAULT_LOCATION)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Synthetic fault scenario the upstream simulator feeds for a machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultScenario {
    #[default]
    Normal,
    Misalignment,
    Unbalance,
    Bearing,
}

impl FaultScenario {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultScenario::Normal => "normal",
            FaultScenario::Misalignment => "misalignment",
            FaultScenario::Unbalance => "unbalance",
            FaultScenario::Bearing => "bearing",
        }
    }
}
