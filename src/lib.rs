pub mod artifact;
pub mod config;
pub mod error;
pub mod history;
pub mod process;
pub mod run;

pub use config::CleaningConfig;
pub use error::{ArtifactError, CleaningError};
