//! Configuration file handling.
//!
//! The configuration file is stored at `$COVERAGE_HOME/config.json` and holds the settings used
//! when reconciling statements, such as how many months of statements are required before the
//! accident date.

use crate::db::Db;
use crate::model::{CoverageMode, DEFAULT_LOOKBACK_MONTHS};
use crate::store::Store;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "coverage";
const CONFIG_VERSION: u8 = 1;
const FILES: &str = "files";
const CONFIG_JSON: &str = "config.json";
const COVERAGE_SQLITE: &str = "coverage.sqlite";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$COVERAGE_HOME` and from there it loads `$COVERAGE_HOME/config.json` and opens the
/// statement database.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    files: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the home directory, the `files` subdirectory, an initial `config.json` with default
    /// settings and an empty database.
    ///
    /// # Errors
    /// - Returns an error if the directory already holds a configuration.
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the coverage home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A configuration already exists at '{}'",
                config_path.display()
            );
        }

        let files = root.join(FILES);
        utils::make_dir(&files).await?;

        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        let sqlite_path = root.join(COVERAGE_SQLITE);
        let db = Db::init(&sqlite_path)
            .await
            .context("Unable to create SQLite DB")?;

        Ok(Self {
            root,
            files,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    /// This will
    /// - validate that `coverage_home` and its config file exist
    /// - load the config file
    /// - validate that the files directory exists
    /// - open the database, upgrading its schema if needed
    pub async fn load(coverage_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = coverage_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Coverage home is missing, run 'coverage init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let files = root.join(FILES);
        if !files.is_dir() {
            bail!("The files directory is missing '{}'", files.display())
        }

        let sqlite_path = root.join(COVERAGE_SQLITE);
        let db = Db::load(&sqlite_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            files,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn files(&self) -> &Path {
        &self.files
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    /// The number of months of statements required before an accident date.
    pub fn lookback_months(&self) -> u32 {
        self.config_file.lookback_months
    }

    /// The coverage mode used when a command does not specify one.
    pub fn coverage_mode(&self) -> CoverageMode {
        self.config_file.coverage_mode
    }

    /// The statement store backed by this configuration's database and files directory.
    pub fn store(&self) -> Store {
        Store::new(self.db.clone(), self.files.clone())
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "coverage",
///   "config_version": 1,
///   "lookback_months": 3,
///   "coverage_mode": "summed"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "coverage"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Months of statements required before the accident date
    #[serde(default = "default_lookback_months")]
    lookback_months: u32,

    /// How overlapping statements are counted, "summed" or "union"
    #[serde(default)]
    coverage_mode: CoverageMode,
}

fn default_lookback_months() -> u32 {
    DEFAULT_LOOKBACK_MONTHS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
            coverage_mode: CoverageMode::default(),
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile from `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;
        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.lookback_months > 0,
            "Invalid lookback_months in config file: must be at least 1"
        );

        Ok(config)
    }

    /// Saves the ConfigFile to `path` as pretty JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}
