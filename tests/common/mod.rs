// Shared test helpers: in-memory feed and snapshot builders

#![allow(dead_code)]

use async_trait::async_trait;
use machine_monitor::feed_client::{FeedError, MachineRegistration, TelemetryFeed};
use machine_monitor::models::{FaultScenario, FeedSnapshot};
use std::sync::Mutex;

/// Feed double: serves whatever snapshot was set last and records outbound signals.
#[derive(Default)]
pub struct MockFeed {
    snapshot: Mutex<Option<serde_json::Value>>,
    failing: Mutex<bool>,
    assigned_id: Mutex<Option<String>>,
    pub registrations: Mutex<Vec<(usize, MachineRegistration)>>,
    pub counts: Mutex<Vec<usize>>,
    pub test_inputs: Mutex<Vec<(FaultScenario, String)>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_snapshot(&self, body: serde_json::Value) {
        *self.snapshot.lock().unwrap() = Some(body);
    }

    /// While set, every call fails as if the service were unreachable.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn assign_id(&self, id: &str) {
        *self.assigned_id.lock().unwrap() = Some(id.to_string());
    }

    fn check(&self) -> Result<(), FeedError> {
        if *self.failing.lock().unwrap() {
            return Err(FeedError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetryFeed for MockFeed {
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot, FeedError> {
        self.check()?;
        let body = self
            .snapshot
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));
        let bytes = serde_json::to_vec(&body)?;
        Ok(FeedSnapshot::parse(&bytes)?)
    }

    async fn register_machine(
        &self,
        count: usize,
        machine: &MachineRegistration,
    ) -> Result<Option<String>, FeedError> {
        self.check()?;
        self.registrations
            .lock()
            .unwrap()
            .push((count, machine.clone()));
        Ok(self.assigned_id.lock().unwrap().clone())
    }

    async fn post_machine_count(&self, count: usize) -> Result<(), FeedError> {
        self.check()?;
        self.counts.lock().unwrap().push(count);
        Ok(())
    }

    async fn post_test_input(
        &self,
        scenario: FaultScenario,
        machine_id: &str,
    ) -> Result<(), FeedError> {
        self.check()?;
        self.test_inputs
            .lock()
            .unwrap()
            .push((scenario, machine_id.to_string()));
        Ok(())
    }
}

/// Feed entry whose x axis carries `rms`; other features are fixed.
pub fn entry(fault: &str, confidence: &str, rms: f64) -> serde_json::Value {
    serde_json::json!({
        "predicted_fault": fault,
        "confidence": confidence,
        "models": { "gnb": fault, "knn": fault, "svm": fault },
        "graph_value": {
            "x": { "rms": rms, "kurtosis": 3.0, "pp": 1.5, "crestf": 2.0 },
            "y": { "rms": rms / 2.0, "kurtosis": 3.1, "pp": 1.4, "crestf": 2.1 },
            "z": { "rms": rms / 4.0, "kurtosis": 3.2, "pp": 1.3, "crestf": 2.2 }
        }
    })
}

pub fn normal(rms: f64) -> serde_json::Value {
    entry("normal", "high", rms)
}

/// Parses a JSON object body the way the HTTP feed would.
pub fn snapshot(body: serde_json::Value) -> FeedSnapshot {
    FeedSnapshot::parse(&serde_json::to_vec(&body).unwrap()).unwrap()
}
