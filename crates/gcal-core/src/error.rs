//! Errors raised while reading or writing event fields.

use thiserror::Error;

/// Result type for field access.
pub type FieldResult<T> = Result<T, FieldError>;

/// A stored or supplied field value could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A calendar date field does not hold a `YYYY-MM-DD` string.
    #[error("invalid date `{value}` at `{path}`, expected YYYY-MM-DD")]
    InvalidDate { path: String, value: String },

    /// A date-time field does not hold an RFC 3339 timestamp.
    #[error("invalid date-time `{value}` at `{path}`, expected RFC 3339")]
    InvalidDateTime { path: String, value: String },

    /// The value written to a field has the wrong shape for that field.
    #[error("unexpected value for `{path}`, expected {expected}")]
    UnexpectedValue {
        path: String,
        expected: &'static str,
    },
}

impl FieldError {
    pub(crate) fn invalid_date(path: &str, value: impl Into<String>) -> Self {
        Self::InvalidDate {
            path: path.to_string(),
            value: value.into(),
        }
    }

    pub(crate) fn invalid_date_time(path: &str, value: impl Into<String>) -> Self {
        Self::InvalidDateTime {
            path: path.to_string(),
            value: value.into(),
        }
    }

    pub(crate) fn unexpected(path: &str, expected: &'static str) -> Self {
        Self::UnexpectedValue {
            path: path.to_string(),
            expected,
        }
    }
}
