// Domain models: feed wire format, machines, samples

mod feed;
mod history;
mod machine;
mod sample;
mod status;

pub use feed::{AxisFeatureValues, FeatureValues, FeedEntry, FeedSnapshot};
pub use history::History;
pub use machine::{
    DEFAULT_CATEGORY, DEFAULT_LOCATION, FaultScenario, Machine, MachineDraft, Origin,
};
pub use sample::{Axis, AxisFeatures, AxisReading, Feature, FeatureSample};
pub use status::{
    HIGH_CONFIDENCE, MODEL_NAMES, NORMAL_FAULT, StatusSnapshot, StatusTag, UNKNOWN_CONFIDENCE,
};
