//! Client error types.

use gcal_events::{ConfigError, EventsError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Settings could not be loaded or are invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The gateway or the calendar API failed.
    #[error("{}: {}", .0.code(), .0.message())]
    Events(#[from] EventsError),

    /// A command-line value could not be used.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Output could not be rendered.
    #[error("output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_error_shows_code_and_message() {
        let err = ClientError::from(EventsError::not_found("event evt not found"));
        assert_eq!(err.to_string(), "not_found: event evt not found");
    }

    #[test]
    fn config_error_is_prefixed() {
        let err = ClientError::from(ConfigError::CalendarIdNotSpecified);
        assert!(err.to_string().starts_with("configuration error: There was no calendar id"));
    }
}
