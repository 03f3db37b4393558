// Model tests: feed wire aliases, JSON shape (camelCase), status tags

use machine_monitor::models::*;

#[test]
fn test_feed_entry_accepts_short_feature_names() {
    let entry: FeedEntry = serde_json::from_str(
        r#"{
            "predicted_fault": "bearing",
            "confidence": "low",
            "features": { "x": { "rms": 1.0, "kurtosis": 2.0, "pp": 3.0, "crestf": 4.0 } }
        }"#,
    )
    .unwrap();
    let x = entry.readings().x;
    assert_eq!(x.peak_to_peak, 3.0);
    assert_eq!(x.crest_factor, 4.0);
}

#[test]
fn test_feed_entry_accepts_long_and_misspelled_feature_names() {
    let values: FeatureValues =
        serde_json::from_str(r#"{"peak_to_peak": 5.0, "crest_factor": 6.0}"#).unwrap();
    assert_eq!(values.reading().peak_to_peak, 5.0);
    assert_eq!(values.reading().crest_factor, 6.0);

    let values: FeatureValues = serde_json::from_str(r#"{"peek-to-peek": 7.0}"#).unwrap();
    assert_eq!(values.reading().peak_to_peak, 7.0);
}

#[test]
fn test_graph_value_wins_over_features() {
    let entry: FeedEntry = serde_json::from_str(
        r#"{
            "graph_value": { "x": { "rms": 1.0 } },
            "features": { "x": { "rms": 2.0 } }
        }"#,
    )
    .unwrap();
    assert_eq!(entry.readings().x.rms, 1.0);
}

#[test]
fn test_feed_entry_status_defaults() {
    let entry: FeedEntry = serde_json::from_str("{}").unwrap();
    let status = entry.status();
    assert_eq!(status.predicted_fault, NORMAL_FAULT);
    assert_eq!(status.confidence, UNKNOWN_CONFIDENCE);
    assert!(status.models.is_empty());
    assert_eq!(status.features, AxisFeatures::default());
    assert_eq!(status.tag, StatusTag::Healthy);
}

#[test]
fn test_feed_entry_tolerates_bad_status_fields() {
    let snapshot = FeedSnapshot::parse(
        br#"{
            "1": {
                "predicted_fault": null,
                "confidence": 2,
                "models": null,
                "graph_value": { "x": { "rms": 1.5 } }
            },
            "2": {
                "predicted_fault": "bearing",
                "confidence": "high",
                "models": { "gnb": "bearing", "knn": null, "svm": 3 },
                "graph_value": { "x": { "rms": 2.5 } }
            }
        }"#,
    )
    .unwrap();
    assert_eq!(snapshot.len(), 2);
    assert!(!snapshot.is_malformed("1"));
    assert!(!snapshot.is_malformed("2"));

    let first = snapshot.get("1").unwrap().status();
    assert_eq!(first.predicted_fault, NORMAL_FAULT);
    assert_eq!(first.confidence, UNKNOWN_CONFIDENCE);
    assert!(first.models.is_empty());
    assert_eq!(first.features.x.rms, 1.5);

    let second = snapshot.get("2").unwrap().status();
    assert_eq!(second.tag, StatusTag::Fault);
    assert_eq!(second.models.len(), 1);
    assert_eq!(second.models.get("gnb").map(String::as_str), Some("bearing"));
}

#[test]
fn test_feed_snapshot_keeps_wire_order_and_flags_malformed() {
    let snapshot =
        FeedSnapshot::parse(br#"{"b": {}, "a": 42, "c": {"confidence": "high"}}"#).unwrap();
    let ids: Vec<&str> = snapshot.entries().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["b", "c"]);
    assert!(snapshot.is_malformed("a"));
    assert!(snapshot.reports("a"));
    assert!(!snapshot.reports("d"));
    assert_eq!(snapshot.len(), 2);
}

#[test]
fn test_status_tag_classification() {
    assert_eq!(StatusTag::classify("normal", "low"), StatusTag::Healthy);
    assert_eq!(StatusTag::classify("Normal", "high"), StatusTag::Healthy);
    assert_eq!(StatusTag::classify("bearing", "high"), StatusTag::Fault);
    assert_eq!(StatusTag::classify("bearing", "low"), StatusTag::Suspect);
    assert_eq!(StatusTag::classify("unbalance", "unknown"), StatusTag::Suspect);
}

#[test]
fn test_baseline_status() {
    let status = StatusSnapshot::baseline();
    assert_eq!(status.predicted_fault, "normal");
    assert_eq!(status.confidence, "high");
    assert_eq!(status.tag, StatusTag::Healthy);
    for name in MODEL_NAMES {
        assert_eq!(status.models.get(name).map(String::as_str), Some("normal"));
    }
}

#[test]
fn test_machine_serialization_camel_case() {
    let machine = Machine::discovered("4", "2024-05-01", 10);
    let json = serde_json::to_value(&machine).unwrap();
    assert_eq!(json["type"], DEFAULT_CATEGORY);
    assert_eq!(json["lastService"], "2024-05-01");
    assert_eq!(json["missedCycles"], 0);
    assert_eq!(json["origin"], "feed");
    assert_eq!(json["status"]["predictedFault"], "normal");
    assert_eq!(json["status"]["tag"], "healthy");
    assert!(json["history"].as_array().unwrap().is_empty());
}

#[test]
fn test_machine_draft_accepts_type_or_category() {
    let draft: MachineDraft =
        serde_json::from_str(r#"{"name": "Saw", "type": "Cutter"}"#).unwrap();
    assert_eq!(draft.category_or_default(), "Cutter");

    let draft: MachineDraft =
        serde_json::from_str(r#"{"name": "Saw", "category": "Cutter", "location": " "}"#)
            .unwrap();
    assert_eq!(draft.category_or_default(), "Cutter");
    assert_eq!(draft.location_or_default(), DEFAULT_LOCATION);
}

#[test]
fn test_fault_scenario_wire_names() {
    let s: FaultScenario = serde_json::from_str("\"misalignment\"").unwrap();
    assert_eq!(s, FaultScenario::Misalignment);
    assert_eq!(FaultScenario::default().as_str(), "normal");
    assert!(serde_json::from_str::<FaultScenario>("\"wobble\"").is_err());
}

#[test]
fn test_axis_and_feature_serialization() {
    assert_eq!(serde_json::to_string(&Axis::Z).unwrap(), "\"z\"");
    assert_eq!(
        serde_json::to_string(&Feature::CrestFactor).unwrap(),
        "\"crestFactor\""
    );
    let sample = FeatureSample {
        timestamp: 3,
        features: AxisFeatures::default(),
    };
    let json = serde_json::to_value(sample).unwrap();
    assert_eq!(json["timestamp"], 3);
    assert!(json["y"]["peakToPeak"].is_number());
}
