use anyhow::{Context, Result};
use basic_cleaning::{artifact::LocalArtifactStore, history::History, run, CleaningConfig};
use clap::Parser;
use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
    });
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    // ─── 2) parse args ───────────────────────────────────────────────
    let config = CleaningConfig::parse();
    info!(?config, "startup");

    // ─── 3) open the artifact store + run ledger ─────────────────────
    let store = LocalArtifactStore::new(&config.artifact_root)
        .with_context(|| format!("opening artifact store {}", config.artifact_root.display()))?;
    let history = History::new(store.ledger_dir())?;

    // ─── 4) run the stage ────────────────────────────────────────────
    let id = run::go(&config, &store, &history).await?;
    info!(artifact = %id, "all done");
    Ok(())
}
