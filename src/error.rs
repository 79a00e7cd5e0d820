//! Error types used throughout the crate.
//!
//! Most fallible code returns `anyhow::Error` with context attached. Domain preconditions that a
//! caller is expected to check before reconciling (inverted date ranges) have their own error
//! type, `InvalidRangeError`, so that callers can match on it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// A date range whose start falls after its end.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("Invalid date range for {label}: start {start} is after end {end}")]
pub struct InvalidRangeError {
    label: String,
    start: NaiveDate,
    end: NaiveDate,
}

impl InvalidRangeError {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// Classifies an error that is returned from a public command so the user can tell which layer
/// failed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Loading or creating the configuration or home directory failed.
    Config,
    /// A database operation failed.
    Database,
    /// Copying, reading or removing a stored statement file failed.
    Storage,
    /// The request itself was invalid, e.g. a bad date range or an unknown ID.
    Request,
}

impl ErrorType {
    /// Creates an error of this type with `message`.
    pub fn error(self, message: impl Into<String>) -> Error {
        Error::msg(message.into()).context(self.to_string())
    }
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorType::Config => "Configuration error",
            ErrorType::Database => "Database error",
            ErrorType::Storage => "Storage error",
            ErrorType::Request => "Request error",
        };
        f.write_str(s)
    }
}

/// Converts an internal result into one suitable for returning from a public command.
pub trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            let e: Error = e.into();
            e.context(error_type.to_string())
        })
    }
}
