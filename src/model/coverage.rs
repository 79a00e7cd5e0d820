use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the days contributed by overlapping statements are combined within a month bucket.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    /// Each covering statement's overlap is added up without removing overlaps between
    /// statements, then clamped to the bucket size. Two overlapping statements can therefore mask
    /// a gap elsewhere in the month.
    #[default]
    Summed,
    /// Only days covered by at least one statement are counted.
    Union,
}

serde_plain::derive_display_from_serialize!(CoverageMode);
serde_plain::derive_fromstr_from_deserialize!(CoverageMode);

/// One calendar month of the required period, clipped to the period's boundaries.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MonthBucket {
    pub(crate) month: u32,
    pub(crate) year: i32,
    pub(crate) start_date: NaiveDate,
    pub(crate) end_date: NaiveDate,
    pub(crate) total_days: u32,
}

impl MonthBucket {
    /// 1-based month number.
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn total_days(&self) -> u32 {
        self.total_days
    }

    /// e.g. `2025-04`
    pub fn name(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// The coverage of a single month bucket.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    pub(crate) bucket: MonthBucket,
    /// Never greater than `bucket.total_days`.
    pub(crate) covered_days: u32,
    /// Between 0 and 100, rounded to two decimal places.
    pub(crate) coverage_percent: Decimal,
    pub(crate) is_complete: bool,
    pub(crate) covering_statement_ids: Vec<String>,
}

impl CoverageResult {
    pub fn bucket(&self) -> &MonthBucket {
        &self.bucket
    }

    pub fn covered_days(&self) -> u32 {
        self.covered_days
    }

    pub fn coverage_percent(&self) -> Decimal {
        self.coverage_percent
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn covering_statement_ids(&self) -> &[String] {
        &self.covering_statement_ids
    }

    /// The number of days in the bucket that still need a statement.
    pub fn missing_days(&self) -> u32 {
        self.bucket.total_days.saturating_sub(self.covered_days)
    }
}

/// Summary across all buckets.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct OverallStatus {
    pub(crate) covered_months: usize,
    pub(crate) total_months: usize,
    pub(crate) is_fully_complete: bool,
}

impl OverallStatus {
    pub fn covered_months(&self) -> usize {
        self.covered_months
    }

    pub fn total_months(&self) -> usize {
        self.total_months
    }

    pub fn is_fully_complete(&self) -> bool {
        self.is_fully_complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::date;
    use std::str::FromStr;

    #[test]
    fn test_coverage_mode_parse() {
        assert_eq!(CoverageMode::default(), CoverageMode::Summed);
        assert_eq!(CoverageMode::from_str("union").unwrap(), CoverageMode::Union);
        assert_eq!(CoverageMode::Summed.to_string(), "summed");
    }

    #[test]
    fn test_missing_days() {
        let result = CoverageResult {
            bucket: MonthBucket {
                month: 6,
                year: 2025,
                start_date: date("2025-06-01"),
                end_date: date("2025-06-30"),
                total_days: 30,
            },
            covered_days: 11,
            coverage_percent: Decimal::new(3667, 2),
            is_complete: false,
            covering_statement_ids: vec!["s1".to_string()],
        };
        assert_eq!(result.missing_days(), 19);
        assert_eq!(result.bucket().name(), "2025-06");
    }
}
