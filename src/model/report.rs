use crate::model::{CoverageMode, CoverageResult, OverallStatus, RequiredPeriod};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The coverage of one instrument's statements over a required period.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub(crate) label: String,
    pub(crate) period: RequiredPeriod,
    pub(crate) mode: CoverageMode,
    pub(crate) results: Vec<CoverageResult>,
    pub(crate) overall: OverallStatus,
}

impl CoverageReport {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn period(&self) -> &RequiredPeriod {
        &self.period
    }

    pub fn mode(&self) -> CoverageMode {
        self.mode
    }

    pub fn results(&self) -> &[CoverageResult] {
        &self.results
    }

    pub fn overall(&self) -> &OverallStatus {
        &self.overall
    }

    /// The buckets that still need statements.
    pub fn incomplete(&self) -> impl Iterator<Item = &CoverageResult> {
        self.results.iter().filter(|r| !r.is_complete())
    }
}

impl Display for CoverageReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} [{}, {} mode]", self.label, self.period, self.mode)?;
        writeln!(
            f,
            "  {:<8} {:<10} {:<10} {:>7} {:>8}  status",
            "month", "from", "to", "days", "covered"
        )?;
        for r in &self.results {
            let b = r.bucket();
            writeln!(
                f,
                "  {:<8} {:<10} {:<10} {:>3}/{:<3} {:>7}%  {}",
                b.name(),
                b.start_date().to_string(),
                b.end_date().to_string(),
                r.covered_days(),
                b.total_days(),
                r.coverage_percent().to_string(),
                if r.is_complete() { "complete" } else { "incomplete" }
            )?;
        }
        write!(
            f,
            "  {} of {} months covered",
            self.overall.covered_months(),
            self.overall.total_months()
        )
    }
}

/// The flattened CSV representation of one bucket in a report.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
struct CsvRow<'a> {
    instrument: &'a str,
    month: String,
    start_date: String,
    end_date: String,
    total_days: u32,
    covered_days: u32,
    coverage_percent: String,
    is_complete: bool,
    covering_statement_ids: String,
}

/// Writes one CSV row per bucket for all `reports`, with a single header row.
pub fn reports_to_csv<'a>(reports: impl IntoIterator<Item = &'a CoverageReport>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for report in reports {
        for r in report.results() {
            let b = r.bucket();
            writer
                .serialize(CsvRow {
                    instrument: report.label(),
                    month: b.name(),
                    start_date: b.start_date().to_string(),
                    end_date: b.end_date().to_string(),
                    total_days: b.total_days(),
                    covered_days: r.covered_days(),
                    coverage_percent: r.coverage_percent().to_string(),
                    is_complete: r.is_complete(),
                    covering_statement_ids: r.covering_statement_ids().join(";"),
                })
                .context("Unable to write coverage row as CSV")?;
        }
    }
    let bytes = writer
        .into_inner()
        .context("Unable to flush the CSV writer")?;
    String::from_utf8(bytes).context("The CSV output was not valid UTF-8")
}
