//! strider: relay between the scheduler's telemetry socket and browser
//! observers.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: listen on 0.0.0.0:3001, scheduler at 127.0.0.1:8081
//! strider
//!
//! # Scheduler in another container
//! strider --upstream-host app --upstream-port 8081
//!
//! # Via a config profile (DOCKER_UPSTREAM_HOST, DOCKER_PORT, ...)
//! STRIDER_PROFILE=docker strider
//! ```

mod api;
mod cli;
mod live;
mod router;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use strider_relay::Relay;

use crate::cli::Cli;
use crate::state::AppState;

/// How long the upstream task gets to wind down after the listener stops.
const UPSTREAM_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    strider_core::config::load_dotenv();
    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed command line");

    let config = cli.into_config();
    config.log_summary();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let relay = Relay::new(&config.upstream);
    let upstream_task = relay.spawn(shutdown_rx.clone());

    let metrics_interval = config.telemetry.metrics_log_interval_secs;
    if metrics_interval > 0 {
        tokio::spawn(report_metrics(
            relay.clone(),
            Duration::from_secs(metrics_interval),
            shutdown_rx.clone(),
        ));
    }

    let addr = config.server.bind_address();
    let state = Arc::new(AppState {
        relay,
        config,
        shutdown: shutdown_rx,
    });
    let app = router::build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind observer listener on {addr}"))?;
    info!(addr = %addr, "observer listener ready (WebSocket on / and /ws)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    match tokio::time::timeout(UPSTREAM_STOP_TIMEOUT, upstream_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "upstream task ended abnormally"),
        Err(_) => warn!("upstream task did not stop in time"),
    }

    info!("strider exited cleanly");
    Ok(())
}

/// Periodic relay metrics log line.
async fn report_metrics(relay: Relay, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(period);
    // The first tick fires immediately.
    interval.tick().await;
    loop {
        tokio::select! {
            _ = interval.tick() => relay.log_metrics(),
            _ = shutdown.changed() => break,
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl_c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
