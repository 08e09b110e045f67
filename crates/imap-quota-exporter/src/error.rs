//! Error types for the exporter.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ValidationError;

/// Errors that can occur while setting up the exporter.
///
/// Per-account check failures are not errors at this level; they are
/// reported through [`crate::CheckOutcome`].
#[derive(Debug, Error)]
pub enum Error {
    /// Config file could not be read.
    #[error("Cannot read config file {path}: {source}")]
    ConfigRead {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the expected structure.
    #[error("Invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Config parsed but failed validation.
    #[error("Invalid config: {}", join(.0))]
    ConfigInvalid(Vec<ValidationError>),

    /// Metric registration failed.
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// I/O error (binding the listener, serving).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
