use anyhow::Result;
use machine_monitor::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        feed = %app_config.feed.base_url,
        refresh_interval_ms = app_config.feed.refresh_interval_ms,
        "{} {} starting",
        version::NAME,
        version::VERSION
    );

    let feed = feed_client::HttpFeed::new(&app_config.feed)?;
    let service = Arc::new(service::MonitorService::new(
        Arc::new(feed),
        app_config.aggregator.settings(),
        app_config.chart.retention_ms,
        app_config.publishing.broadcast_capacity,
    ));

    let ws_connections = Arc::new(AtomicUsize::new(0));
    let (poller_shutdown_tx, poller_shutdown_rx) = tokio::sync::oneshot::channel();
    let (chart_shutdown_tx, chart_shutdown_rx) = tokio::sync::oneshot::channel();

    let poller_handle = worker::spawn_poller(
        worker::PollerDeps {
            service: service.clone(),
            ws_connections: ws_connections.clone(),
            shutdown_rx: poller_shutdown_rx,
        },
        worker::PollerConfig {
            refresh_interval_ms: app_config.feed.refresh_interval_ms,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
        },
    );
    let chart_handle = worker::spawn_chart_ticker(
        service.clone(),
        app_config.chart.refresh_interval_ms,
        chart_shutdown_rx,
    );

    let app = routes::app(service, ws_connections);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Received shutdown signal");
    let _ = poller_shutdown_tx.send(());
    let _ = chart_shutdown_tx.send(());
    let _ = poller_handle.await;
    let _ = chart_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
