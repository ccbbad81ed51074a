use std::sync::Arc;

use absensi_core::{DistanceMatcher, OnnxFaceEncoder};
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http;
mod roster;
mod scheduler;
mod sync;

use config::Config;
use roster::RosterStore;
use scheduler::SyncSchedule;
use sync::RosterSync;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(
        roster_url = %config.roster_url,
        sync_time = %config.sync_time.format("%H:%M"),
        bind = %config.bind_addr,
        tolerance = config.match_tolerance,
        "absensid starting"
    );

    let encoder = OnnxFaceEncoder::load(&config.scrfd_model_path(), &config.arcface_model_path())
        .context("failed to load face models")?;
    let engine = engine::spawn_engine(encoder)?;

    let store = Arc::new(RosterStore::new());
    let sync = Arc::new(RosterSync::new(&config, engine.clone(), store.clone()));

    // Populate the roster before accepting requests
    if let Err(e) = sync.run().await {
        tracing::error!(error = %e, "initial roster sync failed; serving with an empty roster");
    }
    tokio::spawn(scheduler::run(SyncSchedule::new(config.sync_time), sync));

    let state = Arc::new(http::AppState {
        engine,
        store,
        matcher: DistanceMatcher {
            tolerance: config.match_tolerance,
        },
        sync_time: config.sync_time,
    });
    let app = http::router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "absensid ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("http server error")?;

    tracing::info!("absensid shutting down");
    Ok(())
}
