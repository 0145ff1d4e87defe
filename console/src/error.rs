//! Console error types.

use thiserror::Error;

/// Result alias for console operations.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Failure of a console action.
///
/// `Display` is the text shown in the status line.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Rejected locally; no request was sent.
    #[error("{0}")]
    Input(String),

    /// The gateway answered with an error status.
    #[error("{message}")]
    Gateway { status: u16, message: String },

    /// The request never got a response.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway URL is not usable.
    #[error("invalid gateway url: {0}")]
    InvalidUrl(String),
}

impl ConsoleError {
    /// HTTP status of a gateway failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConsoleError::Gateway { status, .. } => Some(*status),
            _ => None,
        }
    }
}
