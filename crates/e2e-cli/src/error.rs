//! Error types for the CLI

use css_adapt_e2e::HarnessError;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// One or more scenarios failed
    #[error("{failed} of {total} scenarios failed")]
    SuiteFailed {
        /// Failed scenarios
        failed: usize,
        /// Scenarios run
        total: usize,
    },

    /// The oracle rejected a stylesheet
    #[error("{path}: {errors} syntax error(s)")]
    InvalidCss {
        /// File checked
        path: String,
        /// Error count
        errors: usize,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Harness error
    #[error("Harness error: {0}")]
    Harness(#[from] HarnessError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the failure was a test verdict rather than a harness problem
    #[must_use]
    pub const fn is_verdict(&self) -> bool {
        matches!(self, Self::SuiteFailed { .. } | Self::InvalidCss { .. })
    }
}
