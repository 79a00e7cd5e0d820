//! The `report` command: reconciles statements against the months before an accident date.

use crate::args::{OutputFormat, ReportArgs};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{reports_to_csv, CoverageReport, RequiredPeriod};
use crate::reconcile::reconcile_instrument;
use crate::{Config, Result};
use anyhow::Context;
use tracing::{debug, warn};

/// Reconciles the statements of one instrument, or of every instrument, against the required
/// period ending on the accident date.
///
/// # Errors
///
/// - Returns an error if `--months` is zero or the period cannot be represented.
/// - Returns an error if the requested instrument does not exist.
pub async fn report(config: Config, args: ReportArgs) -> Result<Out<Vec<CoverageReport>>> {
    let months = args.months().unwrap_or(config.lookback_months());
    if months == 0 {
        return Err(ErrorType::Request.error("The number of months must be at least 1"));
    }
    let mode = args.mode().unwrap_or(config.coverage_mode());
    let period = RequiredPeriod::ending_on(args.accident_date(), months)
        .pub_result(ErrorType::Request)?;
    debug!("Required period is {period} using {mode} coverage");

    let store = config.store();
    let ids: Vec<String> = match args.instrument() {
        Some(id) => vec![id.to_string()],
        None => config
            .db()
            .list_instruments()
            .await
            .pub_result(ErrorType::Database)?
            .into_iter()
            .map(|i| i.id().to_string())
            .collect(),
    };
    if ids.is_empty() {
        warn!("No instruments have been added, there is nothing to report");
    }

    let mut reports = Vec::with_capacity(ids.len());
    for id in &ids {
        let owned = store
            .instrument_statements(id)
            .await
            .pub_result(ErrorType::Request)?;
        reports.push(reconcile_instrument(&owned, &period, mode));
    }

    let complete = reports
        .iter()
        .filter(|r| r.overall().is_fully_complete())
        .count();
    let message = format!(
        "{complete} of {} instrument{} fully covered from {period}",
        reports.len(),
        if reports.len() == 1 { " is" } else { "s are" }
    );
    Ok(Out::new(message, reports))
}

/// Renders reports for stdout in the requested format.
pub fn render(reports: &[CoverageReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(reports
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("\n\n")),
        OutputFormat::Json => {
            serde_json::to_string_pretty(reports).context("Unable to serialize the reports")
        }
        OutputFormat::Csv => reports_to_csv(reports),
    }
}
