//! CLI command implementations for Toe.

pub(crate) mod logging;
pub(crate) mod run;
pub(crate) mod serve;
pub(crate) mod tournament;

mod output;

use clap::ValueEnum;
use std::error::Error;
use std::fmt;

/// Output format for `run` and `tournament`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<toe::ConfigError> for CliError {
    fn from(e: toe::ConfigError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<toe::MatchError> for CliError {
    fn from(e: toe::MatchError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<toe::server::ServerError> for CliError {
    fn from(e: toe::server::ServerError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}
