//! The SQLite database that holds instruments and the metadata of their uploaded statements.
//!
//! Statement files themselves live on disk next to the database; see `crate::store`.

pub(crate) mod migrations;

use crate::model::{Instrument, InstrumentKind, StatementRecord};
use crate::Result;
use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

type InstrumentRow = (String, String, String, String, Option<String>, String);
type StatementRow = (String, String, String, String, String, String, String);

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the schema
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at '{}'", path.display());
        }
        let pool = open_pool(path, true).await?;
        bootstrap_schema_version(&pool).await?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        debug!("Created statement database at {}", path.display());
        Ok(Self { pool })
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Upgrades the schema if it is out-of-date
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing '{}'", path.display());
        }
        let pool = open_pool(path, false).await?;
        let version = schema_version(&pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "The database schema version {version} is newer than this program supports ({})",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    pub(crate) async fn insert_instrument(&self, instrument: &Instrument) -> Result<()> {
        sqlx::query(
            "INSERT INTO instruments (id, kind, name, institution, accident_date, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&instrument.id)
        .bind(instrument.kind.to_string())
        .bind(&instrument.name)
        .bind(&instrument.institution)
        .bind(
            instrument
                .accident_date
                .map(|d| d.format(DATE_FORMAT).to_string()),
        )
        .bind(instrument.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Unable to insert instrument {}", instrument.id))?;
        debug!("Inserted instrument {}", instrument.id);
        Ok(())
    }

    pub(crate) async fn list_instruments(&self) -> Result<Vec<Instrument>> {
        let rows: Vec<InstrumentRow> = sqlx::query_as(
            "SELECT id, kind, name, institution, accident_date, created_at FROM instruments \
             ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Unable to list instruments")?;
        rows.into_iter().map(instrument_from_row).collect()
    }

    pub(crate) async fn get_instrument(&self, id: &str) -> Result<Option<Instrument>> {
        let row: Option<InstrumentRow> = sqlx::query_as(
            "SELECT id, kind, name, institution, accident_date, created_at FROM instruments \
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Unable to get instrument {id}"))?;
        row.map(instrument_from_row).transpose()
    }

    /// Deletes an instrument and, through the foreign key cascade, all of its statements.
    /// Returns the removed statements so that their files can be cleaned up.
    pub(crate) async fn delete_instrument(&self, id: &str) -> Result<Vec<StatementRecord>> {
        let mut tx = self.pool.begin().await.context("Unable to begin transaction")?;

        let rows: Vec<StatementRow> = sqlx::query_as(
            "SELECT id, instrument_id, start_date, end_date, file_ref, file_name, uploaded_at \
             FROM statements WHERE instrument_id = ?",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .context("Unable to read statements of the instrument")?;

        let deleted = sqlx::query("DELETE FROM instruments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Unable to delete instrument {id}"))?;
        if deleted.rows_affected() == 0 {
            bail!("Instrument not found: {id}");
        }

        tx.commit().await.context("Unable to commit transaction")?;
        debug!("Deleted instrument {id} and {} statement(s)", rows.len());
        rows.into_iter().map(statement_from_row).collect()
    }

    pub(crate) async fn insert_statement(&self, statement: &StatementRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO statements \
             (id, instrument_id, start_date, end_date, file_ref, file_name, uploaded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(statement.id())
        .bind(statement.instrument_id())
        .bind(statement.start_date().format(DATE_FORMAT).to_string())
        .bind(statement.end_date().format(DATE_FORMAT).to_string())
        .bind(statement.file_ref())
        .bind(statement.file_name())
        .bind(statement.uploaded_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Unable to insert statement {}", statement.id()))?;
        debug!(
            "Inserted statement {} for instrument {}",
            statement.id(),
            statement.instrument_id()
        );
        Ok(())
    }

    /// Lists the statements of an instrument ordered by start date, then upload time.
    pub(crate) async fn list_statements(&self, instrument_id: &str) -> Result<Vec<StatementRecord>> {
        let rows: Vec<StatementRow> = sqlx::query_as(
            "SELECT id, instrument_id, start_date, end_date, file_ref, file_name, uploaded_at \
             FROM statements WHERE instrument_id = ? ORDER BY start_date, uploaded_at, id",
        )
        .bind(instrument_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Unable to list statements of instrument {instrument_id}"))?;
        rows.into_iter().map(statement_from_row).collect()
    }

    pub(crate) async fn get_statement(&self, id: &str) -> Result<Option<StatementRecord>> {
        let row: Option<StatementRow> = sqlx::query_as(
            "SELECT id, instrument_id, start_date, end_date, file_ref, file_name, uploaded_at \
             FROM statements WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Unable to get statement {id}"))?;
        row.map(statement_from_row).transpose()
    }

    /// Deletes a statement row and returns what was deleted.
    pub(crate) async fn delete_statement(&self, id: &str) -> Result<StatementRecord> {
        let mut tx = self.pool.begin().await.context("Unable to begin transaction")?;

        let row: Option<StatementRow> = sqlx::query_as(
            "SELECT id, instrument_id, start_date, end_date, file_ref, file_name, uploaded_at \
             FROM statements WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("Unable to get statement {id}"))?;
        let Some(row) = row else {
            bail!("Statement not found: {id}");
        };

        let deleted = sqlx::query("DELETE FROM statements WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Unable to delete statement {id}"))?;
        if deleted.rows_affected() == 0 {
            bail!("Statement not found: {id}");
        }

        tx.commit().await.context("Unable to commit transaction")?;
        debug!("Deleted statement {id}");
        statement_from_row(row)
    }
}

/// Opens a connection pool to the SQLite file at `path` with foreign keys enforced.
pub(crate) async fn open_pool(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .context("Failed to parse SQLite connection string")?
        .create_if_missing(create)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open SQLite database at {}", path.display()))
}

/// Creates the `schema_version` table at version 0 if it does not exist.
pub(crate) async fn bootstrap_schema_version(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;
    sqlx::query(
        "INSERT INTO schema_version (version) \
         SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM schema_version)",
    )
    .execute(pool)
    .await
    .context("Failed to insert initial schema version")?;
    Ok(())
}

pub(crate) async fn schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to query schema version")?;
    Ok(row.0)
}

fn instrument_from_row(row: InstrumentRow) -> Result<Instrument> {
    let (id, kind, name, institution, accident_date, created_at) = row;
    Ok(Instrument {
        kind: InstrumentKind::from_str(&kind)
            .with_context(|| format!("Instrument {id} has an unknown kind '{kind}'"))?,
        accident_date: accident_date.as_deref().map(parse_date).transpose()?,
        created_at: parse_timestamp(&created_at)?,
        id,
        name,
        institution,
    })
}

fn statement_from_row(row: StatementRow) -> Result<StatementRecord> {
    let (id, instrument_id, start_date, end_date, file_ref, file_name, uploaded_at) = row;
    let start_date = parse_date(&start_date)?;
    let end_date = parse_date(&end_date)?;
    let uploaded_at = parse_timestamp(&uploaded_at)?;
    Ok(StatementRecord::new(
        id,
        instrument_id,
        start_date,
        end_date,
        file_ref,
        file_name,
        uploaded_at,
    )?)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{s}' in the database"))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp '{s}' in the database"))
}
