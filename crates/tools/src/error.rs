//! Error types for tool execution.

use catalog::CatalogError;
use thiserror::Error;

use crate::envelope::ErrorCode;

/// Errors a tool can raise while handling one call
#[derive(Error, Debug)]
pub enum ToolError {
    /// Arguments did not deserialize or failed validation
    #[error("{0}")]
    InvalidArgs(String),

    /// The underlying scraper failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The tool produced output that could not be turned into JSON
    #[error("Failed to serialize tool output: {0}")]
    Output(String),
}

impl ToolError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        ToolError::InvalidArgs(message.into())
    }

    /// Envelope code reported for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ToolError::InvalidArgs(_) => ErrorCode::InvalidArgs,
            ToolError::Catalog(_) | ToolError::Output(_) => ErrorCode::ToolFailed,
        }
    }
}

/// Convenience type alias for tool results
pub type Result<T> = std::result::Result<T, ToolError>;
