//! `serve` subcommand: runs the Reconciler's four `SchedulerLoop`s, the
//! Download Tracker's poll loop, and the read-only HTTP surface side by
//! side until `ctrl_c`, then waits for each to wind down via the same
//! `CancellationToken`.

use std::sync::Arc;

use holdfast_config::Config;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::http::{create_app, AppState};
use crate::runtime::{Runtime, TRACKER_POLL_INTERVAL};

pub async fn run(config: Config) -> anyhow::Result<()> {
    let runtime = Runtime::build(config).await?;
    let cancel = CancellationToken::new();

    let mut handles = runtime.reconciler.spawn_loops(cancel.clone());
    handles.push(spawn_tracker_loop(Arc::clone(&runtime.tracker), cancel.clone()));

    let app = create_app(AppState { store: Arc::clone(&runtime.store) });
    let listener = tokio::net::TcpListener::bind(runtime.config.server.bind_addr).await?;
    info!(addr = %runtime.config.server.bind_addr, "listening");

    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    cancel.cancel();

    for handle in handles {
        if let Err(err) = handle.await {
            warn!(error = %err, "background loop panicked");
        }
    }
    server.await??;

    Ok(())
}

/// The Tracker has no `SchedulerLoop` of its own — it polls on a fixed
/// interval rather than the Reconciler's four configurable ones — so it
/// gets the same `tokio::select!`-over-`CancellationToken` shape inline.
fn spawn_tracker_loop(
    tracker: Arc<holdfast_core::downloads::tracker::DownloadTracker>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TRACKER_POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = tracker.tick().await {
                        warn!(error = %err, "download tracker tick failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("download tracker loop shutting down");
                    break;
                }
            }
        }
    })
}
