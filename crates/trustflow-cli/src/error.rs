//! CLI error types.

use thiserror::Error;
use trustflow_core::CoreError;
use trustflow_hub::HubError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// The scenario file is malformed or inconsistent.
    #[error("scenario error: {0}")]
    Scenario(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// The hub refused an operation.
    #[error("[{code}] {0}", code = .0.code())]
    Hub(#[from] HubError),

    /// Identifier or coordinate decoding failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Create a scenario error.
    #[must_use]
    pub fn scenario(message: impl Into<String>) -> Self {
        Self::Scenario(message.into())
    }
}
