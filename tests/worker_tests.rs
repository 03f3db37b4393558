// Worker tests: spawn poller and chart ticker, let them tick, shut down

mod common;

use common::{MockFeed, normal};
use machine_monitor::aggregator::AggregatorSettings;
use machine_monitor::models::Axis;
use machine_monitor::service::MonitorService;
use machine_monitor::worker::{PollerConfig, PollerDeps, spawn_chart_ticker, spawn_poller};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, sleep, timeout};

fn deps(service: Arc<MonitorService>, shutdown_rx: tokio::sync::oneshot::Receiver<()>) -> PollerDeps {
    PollerDeps {
        service,
        ws_connections: Arc::new(AtomicUsize::new(0)),
        shutdown_rx,
    }
}

fn service(feed: Arc<MockFeed>) -> Arc<MonitorService> {
    Arc::new(MonitorService::new(
        feed,
        AggregatorSettings::default(),
        20_000,
        16,
    ))
}

#[tokio::test]
async fn poller_refreshes_until_shutdown() {
    let feed = Arc::new(MockFeed::new());
    feed.set_snapshot(json!({ "1": normal(1.0) }));
    let svc = service(feed);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn_poller(
        deps(svc.clone(), shutdown_rx),
        PollerConfig {
            refresh_interval_ms: 20,
            stats_log_interval_secs: 3600,
        },
    );
    sleep(Duration::from_millis(150)).await;
    let _ = shutdown_tx.send(());
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("poller should stop on shutdown")
        .unwrap();

    let refreshes = svc.stats().refreshes_ok.load(Ordering::Relaxed);
    assert!(refreshes >= 2, "expected several refreshes, got {}", refreshes);
    let history_len = svc.machine("1").await.unwrap().history.len();
    assert_eq!(history_len as u64, refreshes);

    // No refresh after shutdown.
    sleep(Duration::from_millis(60)).await;
    assert_eq!(svc.stats().refreshes_ok.load(Ordering::Relaxed), refreshes);
}

#[tokio::test]
async fn poller_keeps_running_through_feed_failures() {
    let feed = Arc::new(MockFeed::new());
    feed.set_failing(true);
    let svc = service(feed.clone());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn_poller(
        deps(svc.clone(), shutdown_rx),
        PollerConfig {
            refresh_interval_ms: 20,
            stats_log_interval_secs: 3600,
        },
    );
    sleep(Duration::from_millis(80)).await;
    feed.set_snapshot(json!({ "1": normal(1.0) }));
    feed.set_failing(false);
    sleep(Duration::from_millis(80)).await;
    let _ = shutdown_tx.send(());
    handle.await.unwrap();

    assert!(svc.stats().refreshes_failed.load(Ordering::Relaxed) >= 1);
    assert!(svc.machine("1").await.is_some());
}

#[tokio::test]
async fn chart_ticker_fills_window_for_selection() {
    let feed = Arc::new(MockFeed::new());
    feed.set_snapshot(json!({ "1": normal(1.0) }));
    let svc = service(feed);
    svc.refresh().await;
    svc.select("1", Axis::X).await.unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn_chart_ticker(svc.clone(), 20, shutdown_rx);
    sleep(Duration::from_millis(100)).await;
    let _ = shutdown_tx.send(());
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("chart ticker should stop on shutdown")
        .unwrap();

    let view = svc.chart_view().await;
    assert!(view.series.iter().all(|s| !s.points.is_empty()));
}

#[tokio::test]
async fn poller_logs_stats_and_keeps_refreshing() {
    let feed = Arc::new(MockFeed::new());
    feed.set_snapshot(json!({ "1": normal(1.0) }));
    let svc = service(feed);
    let ws_connections = Arc::new(AtomicUsize::new(2));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn_poller(
        PollerDeps {
            service: svc.clone(),
            ws_connections: ws_connections.clone(),
            shutdown_rx,
        },
        PollerConfig {
            refresh_interval_ms: 100,
            stats_log_interval_secs: 1,
        },
    );
    // Past the first stats tick.
    sleep(Duration::from_millis(1_300)).await;
    let before = svc.stats().refreshes_ok.load(Ordering::Relaxed);
    sleep(Duration::from_millis(250)).await;
    let _ = shutdown_tx.send(());
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("poller should stop on shutdown")
        .unwrap();

    assert!(before >= 5, "expected refreshes before the stats line, got {}", before);
    assert!(svc.stats().refreshes_ok.load(Ordering::Relaxed) > before);
    assert_eq!(ws_connections.load(Ordering::Relaxed), 2);
}
