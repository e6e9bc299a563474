//! Error types for calendar operations.
//!
//! Every gateway and accessor operation reports failures as an
//! [`EventsError`], classified by an [`ErrorCode`]. Remote failures are passed
//! through to the caller unchanged; nothing here retries or suppresses them.

use std::fmt;

use gcal_core::FieldError;
use thiserror::Error;

use crate::config::ConfigError;

/// The category of an events error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Missing or invalid configuration, including an unresolvable calendar id.
    Configuration,
    /// Credentials were rejected or could not be exchanged for a token.
    AuthenticationFailed,
    /// The credentials lack permission for the calendar.
    AuthorizationFailed,
    /// Connection failed, timed out or the body could not be read.
    NetworkError,
    /// Too many requests.
    RateLimited,
    /// The remote service answered with an unexpected error status.
    ServerError,
    /// The remote service answered with something that does not parse.
    InvalidResponse,
    /// The calendar or event does not exist (404).
    NotFound,
    /// The event cannot be sent as-is (missing id, malformed field).
    InvalidEvent,
    /// The fake gateway has no fixture registered for the call.
    MissingFake,
    /// Unexpected internal state.
    InternalError,
}

impl ErrorCode {
    /// Returns a stable snake_case name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::InvalidEvent => "invalid_event",
            Self::MissingFake => "missing_fake",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised by a gateway, accessor or token source.
#[derive(Debug, Error)]
pub struct EventsError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EventsError {
    /// Creates a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Configuration, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidEvent, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The fake gateway has no fixture for a `get` call.
    pub fn missing_get() -> Self {
        Self::new(
            ErrorCode::MissingFake,
            "No fake get event matches the given parameters.",
        )
    }

    /// The fake gateway has no fixture for a `find` call.
    pub fn missing_find() -> Self {
        Self::new(
            ErrorCode::MissingFake,
            "No fake find event matches the given parameters.",
        )
    }

    /// No calendar id was passed and none is configured.
    pub fn no_default_calendar_id() -> Self {
        Self::configuration("No default calendar id set.")
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EventsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<FieldError> for EventsError {
    fn from(err: FieldError) -> Self {
        Self::invalid_event(err.to_string()).with_source(err)
    }
}

impl From<ConfigError> for EventsError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string()).with_source(err)
    }
}

/// A specialized Result type for calendar operations.
pub type EventsResult<T> = Result<T, EventsError>;
