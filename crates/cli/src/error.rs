//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded
    #[error("Failed to load configuration: {0}")]
    Config(#[from] contracts::ContractError),

    /// A line of the events file is not a raw event
    #[error("Invalid event on line {line}: {message}")]
    EventParse { line: usize, message: String },

    /// Pipeline could not be assembled
    #[error("Pipeline setup failed: {0}")]
    Pipeline(#[from] ingestion::IngestionError),

    /// Sender could not be created
    #[error("Sender setup failed: {0}")]
    Sender(#[from] dispatcher::DispatcherError),

    /// `--endpoint` given to a build without HTTP delivery
    #[error("HTTP delivery to {endpoint} requires the `http` feature")]
    HttpUnavailable { endpoint: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn event_parse(line: usize, message: impl Into<String>) -> Self {
        Self::EventParse {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
