//! Subcommand implementations.

pub mod order;
pub mod queue;
pub mod quote;

use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

use buildmart_admin::AdminError;
use buildmart_storefront::ValidationError;
use buildmart_storefront::config::ConfigError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Input file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Input file is not valid JSON for the expected shape.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("Cannot price cart: {0}")]
    Pricing(#[from] ValidationError),
}

/// Read and decode a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: display,
        source,
    })
}
