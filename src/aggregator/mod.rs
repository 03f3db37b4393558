// Telemetry aggregator: merges feed snapshots into per-machine history and
// keeps the rolling chart window for the selected machine.

mod rolling;
mod state;

pub use rolling::{ChartFeed, ChartPoint, ChartSeries, ChartView, DEFAULT_RETENTION_MS, RollingWindow};
pub use state::{AggregatorSettings, DashboardState, DashboardView, LOCAL_ID_PREFIX, Selection};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregatorError {
    #[error("machine name must be non-empty")]
    EmptyName,
    #[error("unknown machine: {0}")]
    UnknownMachine(String),
    #[error("no machine is selected")]
    NoSelection,
}
