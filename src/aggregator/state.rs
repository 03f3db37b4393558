// Dashboard state container. Every transition borrows the current state and
// returns a new one; callers commit by replacing the whole value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use super::AggregatorError;
use crate::models::{
    Axis, FaultScenario, FeatureSample, FeedSnapshot, History, Machine, MachineDraft, Origin,
    StatusSnapshot,
};

/// Prefix of identifiers minted locally when the feed does not assign one.
pub const LOCAL_ID_PREFIX: &str = "manual-";

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Max samples kept per machine.
    pub history_cap: usize,
    /// Consecutive refreshes a feed-origin machine may be missing before it is dropped.
    pub feed_grace_cycles: u32,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            history_cap: History::DEFAULT_CAP,
            feed_grace_cycles: 30,
        }
    }
}

/// The focused machine and the axis its chart shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub machine_id: String,
    pub axis: Axis,
}

/// What the renderer draws: cards for every machine plus the current selection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub machines: Vec<Machine>,
    pub selection: Option<Selection>,
    pub test_input: FaultScenario,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    machines: Vec<Machine>,
    selection: Option<Selection>,
    test_input: FaultScenario,
    /// Locally removed ids, each with the consecutive refreshes the feed has
    /// omitted it. Cleared past `feed_grace_cycles`, like a missing machine.
    tombstones: BTreeMap<String, u32>,
    settings: AggregatorSettings,
}

impl DashboardState {
    pub fn new(settings: AggregatorSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn machine(&self, id: &str) -> Option<&Machine> {
        self.machines.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// The selected machine as of the last transition.
    pub fn selected_machine(&self) -> Option<&Machine> {
        self.selection
            .as_ref()
            .and_then(|s| self.machine(&s.machine_id))
    }

    pub fn test_input(&self) -> FaultScenario {
        self.test_input
    }

    pub fn is_tombstoned(&self, id: &str) -> bool {
        self.tombstones.contains_key(id)
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            machines: self.machines.clone(),
            selection: self.selection.clone(),
            test_input: self.test_input,
        }
    }

    /// Folds one feed snapshot into the machine set.
    ///
    /// Fed machines come first in snapshot order, each with a new sample appended
    /// and its status replaced. Machines the snapshot does not mention follow in
    /// their previous order: local-origin machines and machines whose entry was
    /// malformed are kept as-is, feed-origin machines are kept until they have
    /// been missing for more than `feed_grace_cycles` refreshes.
    pub fn merge(&self, snapshot: &FeedSnapshot, now: DateTime<Utc>) -> Self {
        let timestamp = now.timestamp_millis().max(0) as u64;
        let today = now.format("%Y-%m-%d").to_string();

        let mut tombstones = self.tombstones.clone();
        tombstones.retain(|id, missed| {
            if snapshot.reports(id) {
                *missed = 0;
                return true;
            }
            *missed = missed.saturating_add(1);
            *missed <= self.settings.feed_grace_cycles
        });

        let mut fed: HashSet<&str> = HashSet::with_capacity(snapshot.len());
        let mut machines = Vec::with_capacity(self.machines.len().max(snapshot.len()));

        for (id, entry) in snapshot.entries() {
            if tombstones.contains_key(id) || !fed.insert(id) {
                continue;
            }
            let mut machine = match self.machine(id) {
                Some(existing) => existing.clone(),
                None => {
                    debug!(machine_id = %id, "new machine from feed");
                    Machine::discovered(id, &today, self.settings.history_cap)
                }
            };
            machine.status = entry.status();
            machine.history.push(FeatureSample {
                timestamp,
                features: machine.status.features,
            });
            machine.origin = Origin::Feed;
            machine.missed_cycles = 0;
            machines.push(machine);
        }

        for machine in &self.machines {
            if fed.contains(machine.id.as_str()) {
                continue;
            }
            if machine.origin == Origin::Local || snapshot.is_malformed(&machine.id) {
                machines.push(machine.clone());
                continue;
            }
            let missed = machine.missed_cycles.saturating_add(1);
            if missed > self.settings.feed_grace_cycles {
                debug!(
                    machine_id = %machine.id,
                    missed_cycles = missed,
                    "dropping machine no longer reported by feed"
                );
                continue;
            }
            let mut retained = machine.clone();
            retained.missed_cycles = missed;
            machines.push(retained);
        }

        let selection = self
            .selection
            .clone()
            .filter(|s| machines.iter().any(|m| m.id == s.machine_id));

        Self {
            machines,
            selection,
            test_input: self.test_input,
            tombstones,
            settings: self.settings.clone(),
        }
    }

    /// Adds a user-created machine. `assigned_id` is the identifier returned by
    /// upstream registration, if any; when absent or already taken a local id is minted.
    pub fn add_local(
        &self,
        draft: &MachineDraft,
        assigned_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(Self, Machine), AggregatorError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(AggregatorError::EmptyName);
        }

        let id = match assigned_id.filter(|id| !id.trim().is_empty()) {
            Some(id) if self.machine(&id).is_none() => id,
            Some(id) => {
                debug!(machine_id = %id, "assigned id already in use; minting a local id");
                self.mint_local_id()
            }
            None => self.mint_local_id(),
        };

        let machine = Machine {
            id: id.clone(),
            name: name.to_string(),
            category: draft.category_or_default().to_string(),
            location: draft.location_or_default().to_string(),
            last_service: now.format("%Y-%m-%d").to_string(),
            status: StatusSnapshot::baseline(),
            history: History::with_cap(self.settings.history_cap),
            origin: Origin::Local,
            missed_cycles: 0,
        };

        let mut next = self.clone();
        next.tombstones.remove(&id);
        next.machines.push(machine.clone());
        Ok((next, machine))
    }

    /// Removes a machine and tombstones its id so the feed cannot bring it back.
    pub fn remove_local(&self, id: &str) -> Result<Self, AggregatorError> {
        if self.machine(id).is_none() {
            return Err(AggregatorError::UnknownMachine(id.to_string()));
        }
        let mut next = self.clone();
        next.machines.retain(|m| m.id != id);
        next.tombstones.insert(id.to_string(), 0);
        if next
            .selection
            .as_ref()
            .is_some_and(|s| s.machine_id == id)
        {
            next.selection = None;
        }
        Ok(next)
    }

    pub fn select(&self, id: &str, axis: Axis) -> Result<Self, AggregatorError> {
        if self.machine(id).is_none() {
            return Err(AggregatorError::UnknownMachine(id.to_string()));
        }
        let mut next = self.clone();
        next.selection = Some(Selection {
            machine_id: id.to_string(),
            axis,
        });
        Ok(next)
    }

    pub fn set_axis(&self, axis: Axis) -> Result<Self, AggregatorError> {
        let mut next = self.clone();
        match next.selection.as_mut() {
            Some(selection) => selection.axis = axis,
            None => return Err(AggregatorError::NoSelection),
        }
        Ok(next)
    }

    pub fn clear_selection(&self) -> Self {
        let mut next = self.clone();
        next.selection = None;
        next
    }

    /// Records the scenario chosen for the selected machine.
    pub fn set_test_input(&self, scenario: FaultScenario) -> Result<Self, AggregatorError> {
        if self.selection.is_none() {
            return Err(AggregatorError::NoSelection);
        }
        let mut next = self.clone();
        next.test_input = scenario;
        Ok(next)
    }

    fn mint_local_id(&self) -> String {
        loop {
            let id = format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4());
            if self.machine(&id).is_none() {
                return id;
            }
        }
    }
}
