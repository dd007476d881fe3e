#![forbid(unsafe_code)]

//! Command-line support layer for the `faro` binary.
//!
//! Holds the pieces the binary needs beyond argument parsing: result and
//! plan rendering, and the optional `faro.toml` profile.

use thiserror::Error;

/// Optional `faro.toml` profile with table paths and parameter defaults.
pub mod config;
/// Result-set and explain-tree renderers.
pub mod output;

/// Error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV writing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Profile parse error.
    #[error(transparent)]
    Profile(#[from] toml::de::Error),
    /// Query engine error.
    #[error(transparent)]
    Engine(#[from] crate::types::FaroError),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}
