// HttpFeed against a local stub of the telemetry service

use axum::{Json, Router, routing::{get, post}};
use machine_monitor::config::AppConfig;
use machine_monitor::feed_client::{HttpFeed, MachineRegistration, TelemetryFeed};
use serde_json::{Value, json};
use tokio::time::{Duration, Instant};

async fn stub_feed(registration_delay: Duration) -> String {
    let app = Router::new()
        .route(
            "/machine_data",
            get(|| async {
                Json(json!({
                    "4": { "predicted_fault": "normal", "graph_value": { "x": { "rms": 0.7 } } }
                }))
            }),
        )
        .route(
            "/update_machine_count",
            post(move |Json(body): Json<Value>| async move {
                if body.get("machine").is_some() {
                    tokio::time::sleep(registration_delay).await;
                }
                Json(json!({ "machine_id": 12 }))
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

fn feed_for(base_url: &str) -> HttpFeed {
    let config = AppConfig::load_from_str(&format!(
        r#"
[server]
port = 8081
host = "127.0.0.1"

[feed]
base_url = "{}"
request_timeout_ms = 5000
registration_timeout_ms = 200
"#,
        base_url
    ))
    .unwrap();
    HttpFeed::new(&config.feed).unwrap()
}

fn registration() -> MachineRegistration {
    MachineRegistration {
        name: "Press".into(),
        category: "Conveyor".into(),
        location: "Floor 1".into(),
        last_maintenance: "2024-05-01".into(),
    }
}

#[tokio::test]
async fn fetch_snapshot_reads_feed_body() {
    let base = stub_feed(Duration::ZERO).await;
    let feed = feed_for(&base);

    let snapshot = feed.fetch_snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("4").unwrap().readings().x.rms, 0.7);
}

#[tokio::test]
async fn register_machine_returns_assigned_id() {
    let base = stub_feed(Duration::ZERO).await;
    let feed = feed_for(&base);

    let id = feed.register_machine(3, &registration()).await.unwrap();
    assert_eq!(id.as_deref(), Some("12"));
    feed.post_machine_count(2).await.unwrap();
}

#[tokio::test]
async fn register_machine_gives_up_after_registration_timeout() {
    let base = stub_feed(Duration::from_secs(5)).await;
    let feed = feed_for(&base);

    let started = Instant::now();
    let result = feed.register_machine(3, &registration()).await;
    assert!(result.is_err());
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "registration waited {:?}",
        started.elapsed()
    );
}
