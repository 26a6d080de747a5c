use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::process::PriceRange;

/// A very basic data cleaning
#[derive(Parser, Debug, Clone, Serialize)]
#[command(name = "basic_cleaning", version)]
pub struct CleaningConfig {
    /// Input artifact containing raw data to be cleaned
    #[arg(long = "input_artifact", alias = "input-artifact")]
    pub input_artifact: String,

    /// Name for the output artifact after cleaning
    #[arg(long = "output_artifact", alias = "output-artifact")]
    pub output_artifact: PathBuf,

    /// Type of the output artifact (e.g., clean_sample)
    #[arg(long = "output_type", alias = "output-type")]
    pub output_type: String,

    /// Description for the output artifact
    #[arg(long = "output_description", alias = "output-description")]
    pub output_description: String,

    /// Minimum price to filter the data (in dollars)
    #[arg(long = "min_price", alias = "min-price", allow_negative_numbers = true)]
    pub min_price: f64,

    /// Maximum price to filter the data (in dollars)
    #[arg(long = "max_price", alias = "max-price", allow_negative_numbers = true)]
    pub max_price: f64,

    /// Root directory of the artifact store
    #[arg(
        long = "artifact_root",
        alias = "artifact-root",
        env = "ARTIFACT_ROOT",
        default_value = "artifacts"
    )]
    pub artifact_root: PathBuf,
}

impl CleaningConfig {
    pub fn price_range(&self) -> PriceRange {
        PriceRange::new(self.min_price, self.max_price)
    }

    /// Artifact name for the output: the file name of `output_artifact`.
    pub fn output_name(&self) -> String {
        self.output_artifact
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output_artifact.display().to_string())
    }

    pub fn output_path(&self) -> &Path {
        &self.output_artifact
    }
}
