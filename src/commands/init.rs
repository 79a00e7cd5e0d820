use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory and its contents:
/// - `config.json` with default settings
/// - the `files` directory where uploaded statements are stored
/// - the SQLite database that records instruments and statements
///
/// # Arguments
/// - `coverage_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/coverage`
///
/// # Errors
/// - Returns an error if the directory has already been initialized.
/// - Returns an error if any file operations fail.
pub async fn init(coverage_home: &Path) -> Result<Out<()>> {
    let config = Config::create(coverage_home)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the coverage directory at {}",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("claims");
        let out = init(&home).await.unwrap();
        assert!(out.message().starts_with("Successfully created"));
        assert!(out.structure().is_none());
        assert!(Config::load(&home).await.is_ok());
    }

    #[tokio::test]
    async fn test_init_twice() {
        let dir = TempDir::new().unwrap();
        init(dir.path()).await.unwrap();
        let err = init(dir.path()).await.unwrap_err();
        assert!(format!("{err:#}").starts_with("Configuration error"));
    }
}
