//! outpostd: Outpost host agent.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use outpost_actions::{actions, Dispatcher, ScriptLauncher, TaskLedger, TaskService};
use outpost_core::AgentConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config; an explicit path on the command line wins.
    let config = match std::env::args().nth(1) {
        Some(path) => AgentConfig::load_from(&PathBuf::from(path))
            .context("failed to load config")?,
        None => {
            if let Err(e) = AgentConfig::write_default_if_missing() {
                tracing::warn!(error = %e, "failed to write default config");
            }
            AgentConfig::load().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to load config, using defaults");
                AgentConfig::default()
            })
        }
    };
    tracing::info!(
        jobs = %config.jobs.dir.display(),
        state = %config.state.dir.display(),
        protocol = config.protocol.default_version,
        "outpostd starting"
    );

    // Task ledger
    let ledger = TaskLedger::open(&config.state.dir)
        .await
        .with_context(|| format!("failed to open task ledger in {}", config.state.dir.display()))?;
    tracing::info!(pending = ledger.entries().await.len(), "task ledger opened");

    // Actions
    let tasks = TaskService::new();
    let registry = actions::builtin(
        tasks.clone(),
        config.jobs.dir.clone(),
        Arc::new(ScriptLauncher),
    )
    .context("failed to register actions")?;
    tracing::info!(methods = ?registry.methods(), "actions registered");

    let dispatcher = Dispatcher::new(registry, tasks, ledger, config.protocol.default_protocol());
    let resumed = dispatcher.resume_persisted().await;
    if resumed > 0 {
        tracing::info!(resumed, "resumed persisted tasks");
    }

    // ── Shutdown ─────────────────────────────────────────────────────────────
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
    };

    let state = outpost_api::ApiState { dispatcher };
    outpost_api::serve(state, &config.api.bind, config.api.port, shutdown)
        .await
        .context("API server failed")?;

    tracing::info!("outpostd stopped");
    Ok(())
}
