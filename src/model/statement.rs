use crate::error::InvalidRangeError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded statement document and the date range it declares.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatementRecord {
    id: String,
    instrument_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    /// Location of the stored file, relative to the files directory.
    file_ref: String,
    /// The name of the file as it was uploaded.
    file_name: String,
    uploaded_at: DateTime<Utc>,
}

impl StatementRecord {
    /// Creates a statement record. Fails when `start_date` is after `end_date`.
    pub fn new(
        id: impl Into<String>,
        instrument_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        file_ref: impl Into<String>,
        file_name: impl Into<String>,
        uploaded_at: DateTime<Utc>,
    ) -> Result<Self, InvalidRangeError> {
        let id = id.into();
        if start_date > end_date {
            return Err(InvalidRangeError::new(
                format!("statement {id}"),
                start_date,
                end_date,
            ));
        }
        Ok(Self {
            id,
            instrument_id: instrument_id.into(),
            start_date,
            end_date,
            file_ref: file_ref.into(),
            file_name: file_name.into(),
            uploaded_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn file_ref(&self) -> &str {
        &self.file_ref
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    /// True when the declared range is not inverted.
    pub fn is_valid(&self) -> bool {
        self.start_date <= self.end_date
    }

    #[cfg(test)]
    /// Builds a record without validating the range so tests can exercise precondition checks.
    pub(crate) fn unchecked(id: &str, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            instrument_id: "test-instrument".to_string(),
            start_date,
            end_date,
            file_ref: format!("{id}.pdf"),
            file_name: format!("{id}.pdf"),
            uploaded_at: DateTime::<Utc>::default(),
        }
    }
}

/// Checks every statement's range and returns the first inverted one as an error.
///
/// Records loaded from the database cannot be inverted, but records assembled by other callers
/// should pass through this before being reconciled.
pub fn validate_statements<'a>(
    statements: impl IntoIterator<Item = &'a StatementRecord>,
) -> Result<(), InvalidRangeError> {
    for s in statements {
        if !s.is_valid() {
            return Err(InvalidRangeError::new(
                format!("statement {}", s.id),
                s.start_date,
                s.end_date,
            ));
        }
    }
    Ok(())
}
