//! Statement command handlers.
//!
//! Every mutation is followed by a fresh reconciliation of the instrument's statements against the
//! accident date recorded for it, so the user immediately sees which months are still incomplete.

use crate::args::{DownloadArgs, IdArgs, ListStatementsArgs, UploadArgs};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{RequiredPeriod, StatementRecord};
use crate::reconcile::reconcile_instrument;
use crate::store::StatementStore;
use crate::{Config, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Stores a statement file for an instrument along with the date range it covers.
///
/// # Errors
///
/// - Returns an error if `start` is after `end`.
/// - Returns an error if the instrument does not exist or the file cannot be read.
pub async fn upload_statement(config: Config, args: UploadArgs) -> Result<Out<StatementRecord>> {
    let statement = config
        .store()
        .upload_statement(args.instrument(), args.file(), args.start(), args.end())
        .await
        .pub_result(ErrorType::Storage)?;

    let message = format!(
        "Uploaded {} covering {} to {} with ID: {}{}",
        statement.file_name(),
        statement.start_date(),
        statement.end_date(),
        statement.id(),
        coverage_summary(&config, statement.instrument_id()).await
    );
    Ok(Out::new(message, statement))
}

/// Lists an instrument's statements ordered by start date.
pub async fn list_statements(
    config: Config,
    args: ListStatementsArgs,
) -> Result<Out<Vec<StatementRecord>>> {
    let statements = config
        .store()
        .list_statements(args.instrument())
        .await
        .pub_result(ErrorType::Database)?;

    let mut message = format!(
        "{} statement{}",
        statements.len(),
        if statements.len() == 1 { "" } else { "s" }
    );
    for s in &statements {
        message.push_str(&format!(
            "\n  {}  {} to {}  {}",
            s.id(),
            s.start_date(),
            s.end_date(),
            s.file_name()
        ));
    }
    Ok(Out::new(message, statements))
}

/// Copies a stored statement file to `dest`. Returns the path that was written.
pub async fn download_statement(config: Config, args: DownloadArgs) -> Result<Out<PathBuf>> {
    let path = config
        .store()
        .download_statement(args.id(), args.dest())
        .await
        .pub_result(ErrorType::Storage)?;
    Ok(Out::new(
        format!("Downloaded statement {} to {}", args.id(), path.display()),
        path,
    ))
}

/// Deletes a statement and its stored file.
pub async fn delete_statement(config: Config, args: IdArgs) -> Result<Out<String>> {
    let instrument_id = match config
        .db()
        .get_statement(args.id())
        .await
        .pub_result(ErrorType::Database)?
    {
        Some(statement) => statement.instrument_id().to_string(),
        None => {
            return Err(ErrorType::Request.error(format!("Statement not found: {}", args.id())))
        }
    };
    config
        .store()
        .delete_statement(args.id())
        .await
        .pub_result(ErrorType::Storage)?;

    let message = format!(
        "Deleted statement {}{}",
        args.id(),
        coverage_summary(&config, &instrument_id).await
    );
    Ok(Out::new(message, args.id().to_string()))
}

/// Describes the instrument's current coverage in one line, prefixed by a newline. The change the
/// caller made is already saved, so a failure here is logged and yields an empty summary.
async fn coverage_summary(config: &Config, instrument_id: &str) -> String {
    match try_coverage_summary(config, instrument_id).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Unable to reconcile the statements of instrument {instrument_id}: {e:#}");
            String::new()
        }
    }
}

async fn try_coverage_summary(config: &Config, instrument_id: &str) -> Result<String> {
    let owned = config
        .store()
        .instrument_statements(instrument_id)
        .await
        .pub_result(ErrorType::Database)?;
    let instrument = owned.instrument();
    let Some(accident_date) = instrument.accident_date() else {
        return Ok(format!(
            "\nNo accident date is recorded for {}, run 'coverage report --accident-date' to \
             check its coverage",
            instrument.label()
        ));
    };
    let period = RequiredPeriod::ending_on(accident_date, config.lookback_months())?;
    let report = reconcile_instrument(&owned, &period, config.coverage_mode());
    debug!("Coverage after change:\n{report}");
    let overall = report.overall();
    Ok(format!(
        "\nCoverage for {} from {period}: {} of {} months complete",
        report.label(),
        overall.covered_months(),
        overall.total_months()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidRangeError;
    use crate::test::{date, TestEnv};

    #[tokio::test]
    async fn test_upload_and_list() {
        let env = TestEnv::new().await;
        let acct = env.add_instrument("Checking").await;
        let may = env.write_file("may.pdf", "may").await;
        let april = env.write_file("april.pdf", "april").await;

        let out = upload_statement(
            env.config(),
            UploadArgs::new(&acct, &may, date("2025-05-01"), date("2025-05-31")),
        )
        .await
        .unwrap();
        assert!(out.message().starts_with("Uploaded may.pdf covering 2025-05-01 to 2025-05-31"));
        assert!(out
            .message()
            .ends_with("No accident date is recorded for Checking (bank_account), run 'coverage \
                        report --accident-date' to check its coverage"));

        upload_statement(
            env.config(),
            UploadArgs::new(&acct, &april, date("2025-04-01"), date("2025-04-30")),
        )
        .await
        .unwrap();

        let listed = list_statements(env.config(), ListStatementsArgs::new(&acct))
            .await
            .unwrap();
        let names: Vec<&str> = listed
            .structure()
            .unwrap()
            .iter()
            .map(|s| s.file_name())
            .collect();
        assert_eq!(names, vec!["april.pdf", "may.pdf"]);
        assert!(listed.message().starts_with("2 statements"));
    }

    #[tokio::test]
    async fn test_summary_uses_accident_date() {
        let env = TestEnv::new().await;
        let acct = env
            .add_claim_instrument("Checking", date("2025-07-15"))
            .await;
        let first = env.write_file("first.pdf", "first").await;
        let second = env.write_file("second.pdf", "second").await;

        let out = upload_statement(
            env.config(),
            UploadArgs::new(&acct, &first, date("2025-05-01"), date("2025-05-31")),
        )
        .await
        .unwrap();
        assert!(out.message().ends_with(
            "Coverage for Checking (bank_account) from 2025-04-15 to 2025-07-15: \
             1 of 4 months complete"
        ));

        let out = upload_statement(
            env.config(),
            UploadArgs::new(&acct, &second, date("2025-04-15"), date("2025-07-15")),
        )
        .await
        .unwrap();
        assert!(out.message().ends_with("4 of 4 months complete"));
        let whole = out.into_structure().unwrap();

        let deleted = delete_statement(env.config(), IdArgs::new(whole.id()))
            .await
            .unwrap();
        assert!(deleted.message().ends_with(
            "Coverage for Checking (bank_account) from 2025-04-15 to 2025-07-15: \
             1 of 4 months complete"
        ));
    }

    #[tokio::test]
    async fn test_summary_with_full_coverage() {
        let env = TestEnv::new().await;
        let acct = env
            .add_claim_instrument("Checking", date("2025-07-15"))
            .await;
        let file = env.write_file("all.pdf", "all").await;
        let out = upload_statement(
            env.config(),
            UploadArgs::new(&acct, &file, date("2025-04-15"), date("2025-07-15")),
        )
        .await
        .unwrap();
        assert!(out.message().ends_with(
            "Coverage for Checking (bank_account) from 2025-04-15 to 2025-07-15: \
             4 of 4 months complete"
        ));
    }

    #[tokio::test]
    async fn test_summary_failure_is_not_an_error() {
        let env = TestEnv::new().await;
        assert_eq!(coverage_summary(&env.config(), "missing").await, "");
    }

    #[tokio::test]
    async fn test_upload_inverted_range() {
        let env = TestEnv::new().await;
        let acct = env.add_instrument("Checking").await;
        let file = env.write_file("x.pdf", "x").await;
        let err = upload_statement(
            env.config(),
            UploadArgs::new(&acct, &file, date("2025-05-31"), date("2025-05-01")),
        )
        .await
        .unwrap_err();
        assert!(format!("{err:#}").starts_with("Storage error"));
        assert!(err.downcast_ref::<InvalidRangeError>().is_some());
        assert!(env.config().db().list_statements(&acct).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_and_delete() {
        let env = TestEnv::new().await;
        let acct = env.add_instrument("Checking").await;
        let file = env.write_file("june.pdf", "june contents").await;
        let uploaded = upload_statement(
            env.config(),
            UploadArgs::new(&acct, &file, date("2025-06-01"), date("2025-06-30")),
        )
        .await
        .unwrap()
        .into_structure()
        .unwrap();

        let dest = env.scratch_dir().join("copy.pdf");
        let out = download_statement(env.config(), DownloadArgs::new(uploaded.id(), &dest))
            .await
            .unwrap();
        assert_eq!(out.structure().unwrap(), &dest);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "june contents");

        let out = delete_statement(env.config(), IdArgs::new(uploaded.id()))
            .await
            .unwrap();
        assert!(out.message().starts_with(&format!("Deleted statement {}", uploaded.id())));

        let err = delete_statement(env.config(), IdArgs::new(uploaded.id()))
            .await
            .unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            format!("Request error: Statement not found: {}", uploaded.id())
        );
    }

    #[tokio::test]
    async fn test_list_unknown_instrument() {
        let env = TestEnv::new().await;
        let err = list_statements(env.config(), ListStatementsArgs::new("missing"))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Instrument not found: missing"));
    }
}
