use chrono::Utc;
use std::path::Path;
use tracing::{info, info_span, Instrument};

use crate::artifact::{ArtifactId, ArtifactStore};
use crate::config::CleaningConfig;
use crate::error::CleaningError;
use crate::history::{Event, History};
use crate::process::{self, TableSummary};

pub const JOB_TYPE: &str = "basic_cleaning";

/// Identifier for one invocation, e.g. `basic_cleaning-20240501T101500123456`.
pub fn new_run_id() -> String {
    format!("{}-{}", JOB_TYPE, Utc::now().format("%Y%m%dT%H%M%S%6f"))
}

/// Download the input artifact, clean it, save it to `output_artifact` and
/// publish that file as a new artifact version.
///
/// `store` and `history` are only used for the span of this call.
pub async fn go<S: ArtifactStore>(
    config: &CleaningConfig,
    store: &S,
    history: &History,
) -> Result<ArtifactId, CleaningError> {
    let run_id = new_run_id();
    let span = info_span!("run", job_type = JOB_TYPE, run_id = %run_id);
    run_stage(&run_id, config, store, history)
        .instrument(span)
        .await
}

async fn run_stage<S: ArtifactStore>(
    run_id: &str,
    config: &CleaningConfig,
    store: &S,
    history: &History,
) -> Result<ArtifactId, CleaningError> {
    history
        .record_config(run_id, config)
        .map_err(CleaningError::History)?;

    info!("Downloading artifact '{}'", config.input_artifact);
    let input = store
        .fetch(&config.input_artifact)
        .await
        .map_err(|source| CleaningError::Fetch {
            reference: config.input_artifact.clone(),
            source,
        })?;
    history
        .record_event(run_id, Event::Used, &input.resolved)
        .map_err(CleaningError::History)?;

    info!("Parsing downloaded artifact");
    let raw = process::load_listings(&input.path)?;
    let cleaned = process::clean(&raw, config.price_range())?;
    info!(
        rows_in = raw.num_rows(),
        rows_out = cleaned.num_rows(),
        "cleaned\n{}",
        TableSummary::of(&cleaned)
    );

    info!("Saving cleaned data to '{}'", config.output_path().display());
    process::write_listings(&cleaned, config.output_path())?;

    let id = publish_output(store, config).await?;
    history
        .record_event(run_id, Event::Logged, &id.to_string())
        .map_err(CleaningError::History)?;
    Ok(id)
}

/// Check the output file is on disk, then hand it to the store.
pub async fn publish_output<S: ArtifactStore>(
    store: &S,
    config: &CleaningConfig,
) -> Result<ArtifactId, CleaningError> {
    let path: &Path = config.output_path();
    if !path.exists() {
        return Err(CleaningError::MissingOutput(path.to_path_buf()));
    }

    let name = config.output_name();
    info!("Uploading cleaned data as '{}'", name);
    store
        .publish(
            path,
            &name,
            &config.output_type,
            &config.output_description,
        )
        .await
        .map_err(|source| CleaningError::Upload { name, source })
}
