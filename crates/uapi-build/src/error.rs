//! Error types for uapi-build.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for uapi-build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur while loading configuration or collecting overlays.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Failed to read configuration file.
    #[error("Failed to read config file: {0}")]
    ReadConfig(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// Failed to read a modified header.
    #[error("Failed to read header {}: {source}", path.display())]
    ReadHeader {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to walk the modified header directory.
    #[error("Failed to walk header directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Input translation unit not found.
    #[error("Translation unit input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Configuration validation error.
    #[error("Config validation error: {0}")]
    Validation(String),
}
