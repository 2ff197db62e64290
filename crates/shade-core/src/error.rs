//! Error types for configuration, discovery and artifact output.
//!
//! Per-item translation failures are not errors at this level: they are
//! reported as [`crate::Outcome::Failure`] and never abort a batch.

use std::path::PathBuf;

use shade_map::MapError;
use thiserror::Error;

/// Errors from loading or validating a [`crate::BatchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors from locating shader sources.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("source path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read directory: {path}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read shader source: {path}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from writing a translation's output files.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The temporary file was written but could not be moved into place.
    #[error("failed to move {temp_path} into place at {target_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize source map for {path}")]
    Map {
        path: PathBuf,
        #[source]
        source: MapError,
    },

    #[error("failed to serialize batch report")]
    Report(#[from] serde_json::Error),
}
