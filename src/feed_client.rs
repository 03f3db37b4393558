// Upstream telemetry service: snapshot polling and outbound signals

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use crate::config::FeedConfig;
use crate::models::{FaultScenario, FeedSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("feed returned HTTP {0}")]
    Status(StatusCode),
    #[error("feed body is not a JSON object: {0}")]
    Body(#[from] serde_json::Error),
}

/// Machine details sent upstream when a machine is added.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineRegistration {
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub location: String,
    pub last_maintenance: String,
}

#[async_trait]
pub trait TelemetryFeed: Send + Sync {
    /// Latest status and features for every machine the service knows.
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot, FeedError>;

    /// Announces a new machine with the resulting machine count. Returns the
    /// identifier the service assigned, if it sent one.
    async fn register_machine(
        &self,
        count: usize,
        machine: &MachineRegistration,
    ) -> Result<Option<String>, FeedError>;

    async fn post_machine_count(&self, count: usize) -> Result<(), FeedError>;

    async fn post_test_input(
        &self,
        scenario: FaultScenario,
        machine_id: &str,
    ) -> Result<(), FeedError>;
}

#[derive(Serialize)]
struct CountBody<'a> {
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    machine: Option<&'a MachineRegistration>,
}

#[derive(Serialize)]
struct TestInputBody<'a> {
    feature: &'a str,
    machine_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct RegistrationResponse {
    #[serde(default)]
    machine_id: Option<serde_json::Value>,
}

impl RegistrationResponse {
    /// Accepts string or numeric ids.
    fn machine_id(self) -> Option<String> {
        match self.machine_id? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// `TelemetryFeed` over HTTP/JSON.
pub struct HttpFeed {
    client: reqwest::Client,
    data_url: String,
    count_url: String,
    test_input_url: String,
    registration_timeout: Duration,
}

impl HttpFeed {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(crate::version::user_agent())
            .build()?;
        Ok(Self {
            client,
            data_url: config.url(&config.machine_data_path),
            count_url: config.url(&config.machine_count_path),
            test_input_url: config.url(&config.test_input_path),
            registration_timeout: Duration::from_millis(config.registration_timeout_ms),
        })
    }

    /// POSTs `body` as JSON. `timeout` overrides the client-wide request timeout.
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        timeout: Option<Duration>,
    ) -> Result<bytes::Bytes, FeedError> {
        let mut request = self.client.post(url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl TelemetryFeed for HttpFeed {
    #[instrument(skip(self), fields(operation = "fetch_snapshot"))]
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot, FeedError> {
        let response = self.client.get(&self.data_url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }
        let body = response.bytes().await?;
        Ok(FeedSnapshot::parse(&body)?)
    }

    #[instrument(skip(self, machine), fields(operation = "register_machine"))]
    async fn register_machine(
        &self,
        count: usize,
        machine: &MachineRegistration,
    ) -> Result<Option<String>, FeedError> {
        let body = self
            .post_json(
                &self.count_url,
                &CountBody {
                    count,
                    machine: Some(machine),
                },
                Some(self.registration_timeout),
            )
            .await?;
        let response: RegistrationResponse = serde_json::from_slice(&body).unwrap_or_default();
        Ok(response.machine_id())
    }

    #[instrument(skip(self), fields(operation = "post_machine_count"))]
    async fn post_machine_count(&self, count: usize) -> Result<(), FeedError> {
        self.post_json(
            &self.count_url,
            &CountBody {
                count,
                machine: None,
            },
            None,
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(operation = "post_test_input"))]
    async fn post_test_input(
        &self,
        scenario: FaultScenario,
        machine_id: &str,
    ) -> Result<(), FeedError> {
        self.post_json(
            &self.test_input_url,
            &TestInputBody {
                feature: scenario.as_str(),
                machine_id,
            },
            None,
        )
        .await?;
        Ok(())
    }
}
