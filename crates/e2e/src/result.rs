//! Result and error types for the harness.
//!
//! Every failure names the semantic role, alias or dataset involved so a
//! report is actionable without reading harness internals. Raw selectors are
//! carried as secondary context only.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A role resolved to zero or several elements for the whole wait window
    #[error("Lookup failed for role `{role}`: expected exactly one element, found {matched} after {waited_ms}ms ({selector})")]
    LookupFailed {
        /// Semantic role name
        role: String,
        /// Selector the role maps to
        selector: String,
        /// Number of elements matched on the last attempt
        matched: usize,
        /// Time spent polling
        waited_ms: u64,
    },

    /// A role that the page object never registered
    #[error("Unknown role `{role}` on page `{page}`")]
    UnknownRole {
        /// Role that was requested
        role: String,
        /// Page object that was asked
        page: String,
    },

    /// Observed state never matched the expectation within the timeout
    #[error("Assertion failed for role `{role}` ({matcher}): expected {expected}, last observed {actual}")]
    AssertionFailed {
        /// Semantic role name
        role: String,
        /// Matcher description (e.g. `have.text`)
        matcher: String,
        /// Expected value
        expected: String,
        /// Last observed value
        actual: String,
    },

    /// A CSS validity judgement went the wrong way
    #[error("CSS oracle: {message}")]
    OracleFailed {
        /// Error message
        message: String,
    },

    /// No request matched a waited-for rule in time
    #[error("Interception `{alias}` timed out after {waited_ms}ms: the page never issued a matching request")]
    InterceptionTimeout {
        /// Rule alias
        alias: String,
        /// Time spent waiting
        waited_ms: u64,
    },

    /// Waiting on an alias that no registered rule carries
    #[error("No interception rule registered under alias `{alias}`")]
    UnknownAlias {
        /// Rule alias
        alias: String,
    },

    /// Clipboard could not be read at all (permission or focus)
    #[error("Clipboard unavailable: {reason}")]
    ClipboardUnavailable {
        /// Why the read was refused
        reason: String,
    },

    /// Clipboard content differs from the expectation
    #[error("Clipboard mismatch: expected {expected_len} bytes, got {actual_len} bytes\n{diff}")]
    ClipboardMismatch {
        /// Expected byte length
        expected_len: usize,
        /// Actual byte length
        actual_len: usize,
        /// Unified diff between expected and actual
        diff: String,
    },

    /// Fixture dataset missing or malformed
    #[error("Fixture error: {message}")]
    FixtureError {
        /// Error message
        message: String,
    },

    /// Input simulation error (e.g. unknown key sequence)
    #[error("Input simulation failed: {message}")]
    InputError {
        /// Error message
        message: String,
    },

    /// Browser driver error
    #[error("Driver error: {message}")]
    DriverError {
        /// Error message
        message: String,
    },

    /// Browser could not be launched
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// A scenario exceeded its overall time budget
    #[error("Scenario `{scenario}` timed out after {ms}ms")]
    ScenarioTimeout {
        /// Scenario name
        scenario: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::DriverError {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::FixtureError {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Short category label used in reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LookupFailed { .. } | Self::UnknownRole { .. } => "lookup",
            Self::AssertionFailed { .. } | Self::OracleFailed { .. } => "assertion",
            Self::InterceptionTimeout { .. } | Self::UnknownAlias { .. } => "interception",
            Self::ClipboardUnavailable { .. } => "clipboard-setup",
            Self::ClipboardMismatch { .. } => "clipboard",
            Self::FixtureError { .. } => "fixture",
            Self::InputError { .. } => "input",
            Self::DriverError { .. }
            | Self::BrowserLaunchError { .. }
            | Self::NavigationError { .. } => "driver",
            Self::ConfigError { .. } => "config",
            Self::ScenarioTimeout { .. } => "timeout",
            Self::Io(_) | Self::Json(_) | Self::Yaml(_) => "io",
        }
    }
}
