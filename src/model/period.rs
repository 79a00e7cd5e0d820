use crate::error::InvalidRangeError;
use anyhow::Context;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The default number of calendar months of statements required before an accident date.
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 3;

/// The window of time, inclusive at both ends, for which statements must be evidenced.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RequiredPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl RequiredPeriod {
    /// Creates a period from explicit boundaries. Fails when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidRangeError> {
        if start > end {
            return Err(InvalidRangeError::new("required period", start, end));
        }
        Ok(Self { start, end })
    }

    /// Derives the period `(accident_date - months, accident_date)`.
    ///
    /// Month subtraction clamps to the end of the target month, so an accident on May 31st with a
    /// three month lookback starts on the last day of February.
    pub fn ending_on(accident_date: NaiveDate, months: u32) -> crate::Result<Self> {
        let start = accident_date
            .checked_sub_months(Months::new(months))
            .with_context(|| {
                format!("Unable to subtract {months} months from the accident date {accident_date}")
            })?;
        Ok(Self::new(start, accident_date)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// The number of days in the period, counting both ends.
    pub fn total_days(&self) -> u32 {
        inclusive_days(self.start, self.end)
    }
}

impl Display for RequiredPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Counts the days from `start` to `end`, including both. Returns 0 when `start > end`.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days() + 1;
    u32::try_from(days).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::date;

    #[test]
    fn test_period_ending_on_accident_date() {
        let period = RequiredPeriod::ending_on(date("2025-07-15"), 3).unwrap();
        assert_eq!(period.start(), date("2025-04-15"));
        assert_eq!(period.end(), date("2025-07-15"));
        assert_eq!(period.total_days(), 92);
    }

    #[test]
    fn test_period_ending_on_clamps_short_months() {
        let period = RequiredPeriod::ending_on(date("2025-05-31"), 3).unwrap();
        assert_eq!(period.start(), date("2025-02-28"));

        let period = RequiredPeriod::ending_on(date("2024-05-31"), 3).unwrap();
        assert_eq!(period.start(), date("2024-02-29"));
    }

    #[test]
    fn test_period_rejects_inverted_range() {
        let err = RequiredPeriod::new(date("2025-07-15"), date("2025-04-15")).unwrap_err();
        assert_eq!(err.start(), date("2025-07-15"));
        assert_eq!(err.end(), date("2025-04-15"));
    }

    #[test]
    fn test_single_day_period() {
        let period = RequiredPeriod::new(date("2025-01-01"), date("2025-01-01")).unwrap();
        assert_eq!(period.total_days(), 1);
    }

    #[test]
    fn test_inclusive_days() {
        assert_eq!(inclusive_days(date("2025-06-10"), date("2025-06-20")), 11);
        assert_eq!(inclusive_days(date("2024-02-01"), date("2024-02-29")), 29);
        assert_eq!(inclusive_days(date("2025-06-20"), date("2025-06-10")), 0);
    }
}
