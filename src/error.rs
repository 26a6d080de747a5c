use arrow::error::ArrowError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures at the artifact store boundary.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("invalid artifact reference '{0}'")]
    InvalidReference(String),

    #[error("artifact '{0}' not found")]
    NotFound(String),

    #[error("I/O error on '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download '{url}'")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unreadable manifest '{path}'")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Every way a cleaning run can abort. None of them are retried.
#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("failed to fetch input artifact '{reference}'")]
    Fetch {
        reference: String,
        #[source]
        source: ArtifactError,
    },

    #[error("I/O error on '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not valid tabular data")]
    Parse {
        path: PathBuf,
        #[source]
        source: ArrowError,
    },

    #[error("table is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("failed to transform table")]
    Transform(#[from] ArrowError),

    #[error("failed to write cleaned data to '{path}'")]
    Write {
        path: PathBuf,
        #[source]
        source: ArrowError,
    },

    #[error("Output file '{0}' does not exist")]
    MissingOutput(PathBuf),

    #[error("failed to publish artifact '{name}'")]
    Upload {
        name: String,
        #[source]
        source: ArtifactError,
    },

    #[error("failed to record run history")]
    History(#[source] anyhow::Error),
}
