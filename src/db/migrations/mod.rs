//! Schema migrations for the statement store.
//!
//! Each schema version `NN` has a pair of embedded SQL files: `migration_NN_up.sql` moves the
//! schema from `NN-1` to `NN` and `migration_NN_down.sql` moves it back.

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::Result;

/// The schema version this build of the crate expects.
pub(crate) const CURRENT_VERSION: i32 = 2;

struct Migration {
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        up_sql: include_str!("migration_01_up.sql"),
        down_sql: include_str!("migration_01_down.sql"),
    },
    Migration {
        version: 2,
        up_sql: include_str!("migration_02_up.sql"),
        down_sql: include_str!("migration_02_down.sql"),
    },
];

/// Moves the schema from version `from` to version `to`, one step at a time. Every step runs in
/// its own transaction together with the `schema_version` update.
pub(crate) async fn run(pool: &SqlitePool, from: i32, to: i32) -> Result<()> {
    if from == to {
        debug!("Statement store schema is at version {to}");
        return Ok(());
    }
    validate_migrations(from, to)?;

    for (version, upgrade) in steps(from, to) {
        let migration = find(version)?;
        let (sql, resulting_version, direction) = if upgrade {
            (migration.up_sql, version, "up")
        } else {
            (migration.down_sql, version - 1, "down")
        };
        debug!("Applying schema migration {version:02} ({direction})");
        apply(pool, sql, resulting_version)
            .await
            .with_context(|| format!("Schema migration {version:02} ({direction}) failed"))?;
    }

    debug!("Statement store schema migrated from version {from} to {to}");
    Ok(())
}

/// The ordered `(migration version, is_upgrade)` pairs needed to get from `from` to `to`.
fn steps(from: i32, to: i32) -> Vec<(i32, bool)> {
    if from < to {
        ((from + 1)..=to).map(|v| (v, true)).collect()
    } else {
        ((to + 1)..=from).rev().map(|v| (v, false)).collect()
    }
}

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn apply(pool: &SqlitePool, sql: &str, resulting_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;
    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;
    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(resulting_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;
    tx.commit()
        .await
        .context("Failed to commit migration transaction")
}

/// Fails before anything runs if a migration between `from` and `to` is missing.
fn validate_migrations(from: i32, to: i32) -> Result<()> {
    for (version, _) in steps(from, to) {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!("Migration {version} is missing but required to migrate from version {from} to {to}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{bootstrap_schema_version, open_pool, schema_version};
    use tempfile::TempDir;

    /// Creates an empty database whose schema is at version 0.
    async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let pool = open_pool(&temp_dir.path().join("test.sqlite"), true).await?;
        bootstrap_schema_version(&pool).await?;
        Ok((temp_dir, pool))
    }

    async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let row: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?")
                .bind(table_name)
                .fetch_one(pool)
                .await
                .context("Failed to check table existence")?;
        Ok(row.0 > 0)
    }

    async fn instruments_column_exists(pool: &SqlitePool, column: &str) -> Result<bool> {
        let row: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM pragma_table_info('instruments') WHERE name = ?")
                .bind(column)
                .fetch_one(pool)
                .await
                .context("Failed to check column existence")?;
        Ok(row.0 > 0)
    }

    #[tokio::test]
    async fn test_migration_up_creates_tables() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();

        assert_eq!(schema_version(&pool).await.unwrap(), 0);

        run(&pool, 0, 1).await.unwrap();
        assert_eq!(schema_version(&pool).await.unwrap(), 1);

        assert!(table_exists(&pool, "instruments").await.unwrap());
        assert!(table_exists(&pool, "statements").await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_down_drops_tables() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();

        run(&pool, 0, 1).await.unwrap();
        assert_eq!(schema_version(&pool).await.unwrap(), 1);

        run(&pool, 1, 0).await.unwrap();
        assert_eq!(schema_version(&pool).await.unwrap(), 0);

        assert!(!table_exists(&pool, "instruments").await.unwrap());
        assert!(!table_exists(&pool, "statements").await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_02_adds_accident_date() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();

        run(&pool, 0, 1).await.unwrap();
        assert!(!instruments_column_exists(&pool, "accident_date").await.unwrap());

        run(&pool, 1, 2).await.unwrap();
        assert_eq!(schema_version(&pool).await.unwrap(), 2);
        assert!(instruments_column_exists(&pool, "accident_date").await.unwrap());

        run(&pool, 2, 1).await.unwrap();
        assert_eq!(schema_version(&pool).await.unwrap(), 1);
        assert!(!instruments_column_exists(&pool, "accident_date").await.unwrap());
        assert!(table_exists(&pool, "instruments").await.unwrap());
    }

    #[tokio::test]
    async fn test_migration_no_op_when_already_at_target() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();

        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 1).await.unwrap();
        assert_eq!(schema_version(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_statement_range_check_constraint() {
        let (_temp_dir, pool) = create_test_db().await.unwrap();
        run(&pool, 0, 1).await.unwrap();

        sqlx::query(
            "INSERT INTO instruments (id, kind, name, created_at) \
             VALUES ('acct', 'bank_account', 'Checking', '2025-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let inverted = sqlx::query(
            "INSERT INTO statements \
             (id, instrument_id, start_date, end_date, file_ref, file_name, uploaded_at) \
             VALUES ('s1', 'acct', '2025-06-30', '2025-06-01', 's1.pdf', 'x.pdf', \
             '2025-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await;
        assert!(inverted.is_err());
    }

    #[test]
    fn test_steps() {
        assert_eq!(steps(0, 2), vec![(1, true), (2, true)]);
        assert_eq!(steps(2, 0), vec![(2, false), (1, false)]);
        assert!(steps(1, 1).is_empty());
    }

    #[test]
    fn test_validate_migrations_succeeds_for_valid_range() {
        assert!(validate_migrations(0, CURRENT_VERSION).is_ok());
        assert!(validate_migrations(CURRENT_VERSION, 0).is_ok());
        assert!(validate_migrations(1, 0).is_ok());
    }

    #[test]
    fn test_validate_migrations_fails_for_missing_migration() {
        // Migration 3 doesn't exist
        assert!(validate_migrations(0, 3).is_err());
        assert!(validate_migrations(2, 4).is_err());
    }
}
