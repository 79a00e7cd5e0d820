//! Statement storage: the database rows plus the uploaded files they refer to.

use crate::db::Db;
use crate::error::InvalidRangeError;
use crate::model::{InstrumentStatements, StatementRecord};
use crate::{utils, Result};
use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The operations the reconciler's callers need in order to keep a snapshot of statements
/// current.
#[async_trait]
pub trait StatementStore {
    /// Lists an instrument's statements ordered by start date.
    async fn list_statements(&self, instrument_id: &str) -> Result<Vec<StatementRecord>>;

    /// Stores a copy of `file` and records the date range it covers.
    async fn upload_statement(
        &self,
        instrument_id: &str,
        file: &Path,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<StatementRecord>;

    /// Removes a statement and its stored file.
    async fn delete_statement(&self, statement_id: &str) -> Result<()>;
}

/// The SQLite and filesystem backed `StatementStore`.
#[derive(Debug, Clone)]
pub struct Store {
    db: Db,
    files: PathBuf,
}

impl Store {
    pub(crate) fn new(db: Db, files: impl Into<PathBuf>) -> Self {
        Self {
            db,
            files: files.into(),
        }
    }

    /// Where the file for `statement` is stored.
    pub fn file_path(&self, statement: &StatementRecord) -> PathBuf {
        self.files.join(statement.file_ref())
    }

    /// Loads an instrument together with its current statements.
    pub async fn instrument_statements(&self, instrument_id: &str) -> Result<InstrumentStatements> {
        let Some(instrument) = self.db.get_instrument(instrument_id).await? else {
            bail!("Instrument not found: {instrument_id}");
        };
        let statements = self.db.list_statements(instrument_id).await?;
        Ok(InstrumentStatements::new(instrument, statements))
    }

    /// Copies a stored statement file to `dest`. When `dest` is a directory, the file keeps the
    /// name it was uploaded with. Returns the path written.
    pub async fn download_statement(&self, statement_id: &str, dest: &Path) -> Result<PathBuf> {
        let Some(statement) = self.db.get_statement(statement_id).await? else {
            bail!("Statement not found: {statement_id}");
        };
        let source = self.file_path(&statement);
        if !source.is_file() {
            bail!(
                "The file for statement {statement_id} is missing from storage '{}'",
                source.display()
            );
        }
        let target = if dest.is_dir() {
            dest.join(statement.file_name())
        } else {
            dest.to_path_buf()
        };
        utils::copy(&source, &target).await?;
        debug!("Downloaded statement {statement_id} to {}", target.display());
        Ok(target)
    }

    /// Deletes an instrument, its statements and their files. Returns the deleted statements.
    pub async fn delete_instrument(&self, instrument_id: &str) -> Result<Vec<StatementRecord>> {
        let removed = self.db.delete_instrument(instrument_id).await?;
        for statement in &removed {
            self.remove_file(statement).await?;
        }
        Ok(removed)
    }

    async fn remove_file(&self, statement: &StatementRecord) -> Result<()> {
        let path = self.file_path(statement);
        if !utils::remove_file(&path).await? {
            warn!(
                "The file for statement {} was already missing: {}",
                statement.id(),
                path.display()
            );
        }
        Ok(())
    }
}

/// Removes a file that was copied for a statement that was never recorded. Failures are logged
/// because the caller is already returning the error that made the file unnecessary.
async fn discard_file(path: &Path) {
    if let Err(e) = utils::remove_file(path).await {
        warn!(
            "Unable to remove the orphaned statement file {}: {e:#}",
            path.display()
        );
    }
}

#[async_trait]
impl StatementStore for Store {
    async fn list_statements(&self, instrument_id: &str) -> Result<Vec<StatementRecord>> {
        if self.db.get_instrument(instrument_id).await?.is_none() {
            bail!("Instrument not found: {instrument_id}");
        }
        self.db.list_statements(instrument_id).await
    }

    async fn upload_statement(
        &self,
        instrument_id: &str,
        file: &Path,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<StatementRecord> {
        if start_date > end_date {
            let e = InvalidRangeError::new("the uploaded statement", start_date, end_date);
            return Err(e.into());
        }
        if self.db.get_instrument(instrument_id).await?.is_none() {
            bail!("Instrument not found: {instrument_id}");
        }
        if !file.is_file() {
            bail!("The statement file does not exist '{}'", file.display());
        }
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("The path '{}' has no usable file name", file.display()))?
            .to_string();

        let id = utils::generate_id();
        let file_ref = match file.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{id}.{}", ext.to_lowercase()),
            None => id.clone(),
        };
        let statement = StatementRecord::new(
            id,
            instrument_id,
            start_date,
            end_date,
            file_ref,
            file_name,
            Utc::now(),
        )?;

        let stored = self.file_path(&statement);
        utils::copy(file, &stored).await?;
        if let Err(e) = self.db.insert_statement(&statement).await {
            // Leave no orphaned file behind when the row cannot be written.
            discard_file(&stored).await;
            return Err(e);
        }
        debug!(
            "Stored statement {} ({} to {}) at {}",
            statement.id(),
            start_date,
            end_date,
            stored.display()
        );
        Ok(statement)
    }

    async fn delete_statement(&self, statement_id: &str) -> Result<()> {
        let statement = self.db.delete_statement(statement_id).await?;
        self.remove_file(&statement).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{date, TestEnv};

    #[tokio::test]
    async fn test_upload_list_download_delete() {
        let env = TestEnv::new().await;
        let acct = env.add_instrument("Checking").await;
        let store = env.config().store();
        let source = env.write_file("june-2025.PDF", "june statement").await;

        let uploaded = store
            .upload_statement(&acct, &source, date("2025-06-01"), date("2025-06-30"))
            .await
            .unwrap();
        assert_eq!(uploaded.file_name(), "june-2025.PDF");
        assert!(uploaded.file_ref().ends_with(".pdf"));
        assert!(store.file_path(&uploaded).is_file());

        let listed = store.list_statements(&acct).await.unwrap();
        assert_eq!(listed, vec![uploaded.clone()]);

        let out_dir = env.scratch_dir();
        let written = store.download_statement(uploaded.id(), &out_dir).await.unwrap();
        assert_eq!(written, out_dir.join("june-2025.PDF"));
        assert_eq!(utils::read(&written).await.unwrap(), "june statement");

        store.delete_statement(uploaded.id()).await.unwrap();
        assert!(!store.file_path(&uploaded).exists());
        assert!(store.list_statements(&acct).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_inverted_range() {
        let env = TestEnv::new().await;
        let acct = env.add_instrument("Checking").await;
        let source = env.write_file("x.pdf", "x").await;
        let err = env
            .config()
            .store()
            .upload_statement(&acct, &source, date("2025-06-30"), date("2025-06-01"))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<InvalidRangeError>().is_some());
    }

    #[tokio::test]
    async fn test_upload_to_unknown_instrument() {
        let env = TestEnv::new().await;
        let source = env.write_file("x.pdf", "x").await;
        let err = env
            .config()
            .store()
            .upload_statement("nope", &source, date("2025-06-01"), date("2025-06-30"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Instrument not found"));
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let env = TestEnv::new().await;
        let acct = env.add_instrument("Checking").await;
        let missing = env.scratch_dir().join("missing.pdf");
        let err = env
            .config()
            .store()
            .upload_statement(&acct, &missing, date("2025-06-01"), date("2025-06-30"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_delete_statement_with_missing_file() {
        let env = TestEnv::new().await;
        let acct = env.add_instrument("Checking").await;
        let store = env.config().store();
        let source = env.write_file("x.pdf", "x").await;
        let uploaded = store
            .upload_statement(&acct, &source, date("2025-06-01"), date("2025-06-30"))
            .await
            .unwrap();
        utils::remove_file(store.file_path(&uploaded)).await.unwrap();

        store.delete_statement(uploaded.id()).await.unwrap();
        let err = store
            .download_statement(uploaded.id(), &env.scratch_dir())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Statement not found"));
    }

    #[tokio::test]
    async fn test_discard_file() {
        let env = TestEnv::new().await;
        let orphan = env.write_file("orphan.pdf", "x").await;
        discard_file(&orphan).await;
        assert!(!orphan.exists());

        // Already gone, and a path that cannot be removed as a file, are both tolerated.
        discard_file(&orphan).await;
        let dir = env.scratch_dir();
        discard_file(&dir).await;
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_delete_instrument_removes_files() {
        let env = TestEnv::new().await;
        let acct = env.add_instrument("Checking").await;
        let store = env.config().store();
        let source = env.write_file("x.pdf", "x").await;
        let uploaded = store
            .upload_statement(&acct, &source, date("2025-06-01"), date("2025-06-30"))
            .await
            .unwrap();

        let removed = store.delete_instrument(&acct).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert!(!store.file_path(&uploaded).exists());
        assert!(store.instrument_statements(&acct).await.is_err());
    }
}
