//! 🤖 toybot — a demo robot that staples a random toy onto every reference it's handed.
//!
//! 🚀 `run` wires it all together: HTTP clients, controller, generator, supervisor, poll loop,
//! and a shutdown token that SIGINT/SIGTERM pull on. Everything else is in the modules.

pub mod app_config;
pub(crate) mod backends;
pub mod common;
pub(crate) mod composers;
pub mod error;
pub(crate) mod supervisors;
pub(crate) mod transforms;
pub(crate) mod workers;

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app_config::AppConfig;
use crate::backends::{BlobUploader, HttpController};
use crate::composers::EnhancementComposer;
use crate::supervisors::Supervisor;
use crate::transforms::EnhancementGenerator;
use crate::workers::Poller;

pub use crate::error::RobotError;
pub use crate::workers::PollStats;

/// 🚀 Poll until SIGINT or SIGTERM, then return what the loop got up to.
pub async fn run(app_config: AppConfig) -> Result<PollStats> {
    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));
    run_until(app_config, shutdown).await
}

/// 🛑 Same as `run`, but the caller owns the shutdown token.
pub async fn run_until(app_config: AppConfig, shutdown: CancellationToken) -> Result<PollStats> {
    info!(
        "🤖 starting {} {} ({:?}) as robot {}",
        app_config.robot.source_name,
        app_config.robot.robot_version,
        app_config.environment,
        app_config.controller.robot_id
    );
    info!("⏱️ polling interval: {} seconds", app_config.runtime.poll_interval_seconds);
    info!("📦 batch size: {}", app_config.runtime.batch_size);

    // -- 📡 controller calls are small, so they get a hard deadline
    let controller_client = reqwest::Client::builder()
        .connect_timeout(app_config.controller.connect_timeout())
        .timeout(app_config.controller.request_timeout())
        .build()
        .context("💀 The controller HTTP client refused to be born. Probably TLS. It's always TLS.")?;
    // -- 🪣 storage transfers can be big, so only the handshake is bounded
    let storage_client = reqwest::Client::builder()
        .connect_timeout(app_config.controller.connect_timeout())
        .build()
        .context("💀 The storage HTTP client refused to be born.")?;

    let controller = Arc::new(
        HttpController::new(controller_client, &app_config.controller)
            .context("💀 Could not set up the controller client")?,
    );
    let generator = EnhancementGenerator::new(
        app_config.robot.source_name.clone(),
        app_config.robot.robot_version.clone(),
        StdRng::from_os_rng(),
    );
    let supervisor = Supervisor::new(
        controller.clone(),
        EnhancementComposer::new(storage_client.clone(), generator),
        BlobUploader::new(storage_client),
    );

    let stats = Poller::new(controller, supervisor, &app_config.runtime)
        .run(shutdown)
        .await;
    info!("👋 shutdown complete");
    Ok(stats)
}

/// 📡 Wait for SIGINT (or SIGTERM on unix), then cancel the token. The loop does the rest.
async fn cancel_on_signal(shutdown: CancellationToken) {
    wait_for_signal().await;
    info!("🛑 received shutdown signal, finishing the current step before stopping");
    shutdown.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!("⚠️ could not listen for SIGTERM ({}), only ctrl-c will stop the robot", err);
            wait_for_ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => info!("📡 SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("📡 SIGINT"),
        Err(err) => {
            // -- 💀 no signal handler means no graceful stop; park forever instead of stopping now
            warn!("⚠️ could not listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
