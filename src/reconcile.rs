//! Statement coverage reconciliation.
//!
//! Given a required period and the statements that have been uploaded for an instrument, this
//! module splits the period into calendar month buckets and reports how many days of each bucket
//! are covered by a statement. Everything here is a pure function of its inputs; callers re-run
//! it against a fresh snapshot of statements after every upload or deletion.

use crate::model::{
    inclusive_days, CoverageMode, CoverageReport, CoverageResult, HasStatements, MonthBucket,
    OverallStatus, RequiredPeriod, StatementRecord,
};
use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, trace};

/// Splits `period` into chronologically ordered calendar month buckets. The first and last
/// buckets are clipped to the period and may be partial months.
pub fn build_month_buckets(period: &RequiredPeriod) -> Vec<MonthBucket> {
    month_buckets(period.start(), period.end())
}

/// Produces the month buckets covering `[start, end]`, or nothing when `start > end`.
pub(crate) fn month_buckets(start: NaiveDate, end: NaiveDate) -> Vec<MonthBucket> {
    let mut buckets = Vec::new();
    if start > end {
        return buckets;
    }
    let mut cursor = first_of_month(start);
    while cursor <= end {
        let month_end = last_of_month(cursor);
        let start_date = cursor.max(start);
        let end_date = month_end.min(end);
        buckets.push(MonthBucket {
            month: cursor.month(),
            year: cursor.year(),
            start_date,
            end_date,
            total_days: inclusive_days(start_date, end_date),
        });
        match month_end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    buckets
}

/// Computes coverage for each bucket using `CoverageMode::Summed`.
pub fn compute_coverage(
    buckets: &[MonthBucket],
    statements: &[StatementRecord],
) -> Vec<CoverageResult> {
    compute_coverage_with_mode(buckets, statements, CoverageMode::Summed)
}

/// Computes coverage for each bucket.
///
/// Statements must have `start_date <= end_date`; use `validate_statements` to check input that
/// did not come from the store. Inverted ranges trip a debug assertion.
pub fn compute_coverage_with_mode(
    buckets: &[MonthBucket],
    statements: &[StatementRecord],
    mode: CoverageMode,
) -> Vec<CoverageResult> {
    debug_assert!(
        statements.iter().all(StatementRecord::is_valid),
        "statements with inverted date ranges must be filtered out before reconciling"
    );
    buckets
        .iter()
        .map(|bucket| bucket_coverage(bucket, statements, mode))
        .collect()
}

fn bucket_coverage(
    bucket: &MonthBucket,
    statements: &[StatementRecord],
    mode: CoverageMode,
) -> CoverageResult {
    // (statement id, clipped start, clipped end) for each statement overlapping the bucket
    let overlaps: Vec<(&str, NaiveDate, NaiveDate)> = statements
        .iter()
        .filter(|s| s.start_date() <= bucket.end_date && s.end_date() >= bucket.start_date)
        .map(|s| {
            (
                s.id(),
                s.start_date().max(bucket.start_date),
                s.end_date().min(bucket.end_date),
            )
        })
        .collect();

    let raw_days: u64 = match mode {
        CoverageMode::Summed => overlaps
            .iter()
            .map(|(_, start, end)| u64::from(inclusive_days(*start, *end)))
            .sum(),
        CoverageMode::Union => union_days(overlaps.iter().map(|(_, start, end)| (*start, *end))),
    };

    let total = bucket.total_days;
    let result = CoverageResult {
        bucket: *bucket,
        covered_days: u32::try_from(raw_days.min(u64::from(total))).unwrap_or(total),
        coverage_percent: percent(raw_days, total),
        is_complete: total > 0 && raw_days >= u64::from(total),
        covering_statement_ids: overlaps.iter().map(|(id, _, _)| id.to_string()).collect(),
    };
    trace!(
        "Bucket {} covered {}/{} days by {} statement(s)",
        bucket.name(),
        result.covered_days,
        total,
        overlaps.len()
    );
    result
}

/// Counts the days covered by at least one of the inclusive `ranges`.
fn union_days(ranges: impl IntoIterator<Item = (NaiveDate, NaiveDate)>) -> u64 {
    let mut ranges: Vec<(NaiveDate, NaiveDate)> = ranges.into_iter().collect();
    ranges.sort();
    let mut total = 0u64;
    let mut current: Option<(NaiveDate, NaiveDate)> = None;
    for (start, end) in ranges {
        current = match current {
            // Adjacent ranges merge as well as overlapping ones.
            Some((cur_start, cur_end)) if start <= cur_end.succ_opt().unwrap_or(cur_end) => {
                Some((cur_start, cur_end.max(end)))
            }
            Some((cur_start, cur_end)) => {
                total += u64::from(inclusive_days(cur_start, cur_end));
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((start, end)) = current {
        total += u64::from(inclusive_days(start, end));
    }
    total
}

/// `min(100, covered / total * 100)`, rounded to two decimal places.
fn percent(covered: u64, total: u32) -> Decimal {
    if total == 0 || covered == 0 {
        return Decimal::ZERO;
    }
    let p = Decimal::from(covered) * Decimal::ONE_HUNDRED / Decimal::from(total);
    p.min(Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Summarizes how many buckets are complete.
pub fn overall_status(results: &[CoverageResult]) -> OverallStatus {
    let covered_months = results.iter().filter(|r| r.is_complete).count();
    let total_months = results.len();
    OverallStatus {
        covered_months,
        total_months,
        is_fully_complete: total_months > 0 && covered_months == total_months,
    }
}

/// Builds the buckets for `period`, computes their coverage and summarizes them.
pub fn reconcile(
    label: impl Into<String>,
    period: &RequiredPeriod,
    statements: &[StatementRecord],
    mode: CoverageMode,
) -> CoverageReport {
    let label = label.into();
    let buckets = build_month_buckets(period);
    let results = compute_coverage_with_mode(&buckets, statements, mode);
    let overall = overall_status(&results);
    debug!(
        "Reconciled {} statement(s) for {label} over {period}: {} of {} months covered",
        statements.len(),
        overall.covered_months,
        overall.total_months
    );
    CoverageReport {
        label,
        period: *period,
        mode,
        results,
        overall,
    }
}

/// Reconciles any bank account, credit card or other holder of statements.
pub fn reconcile_instrument<I>(
    instrument: &I,
    period: &RequiredPeriod,
    mode: CoverageMode,
) -> CoverageReport
where
    I: HasStatements + ?Sized,
{
    reconcile(instrument.label(), period, instrument.statements(), mode)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// `date` must be the first of a month.
fn last_of_month(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
