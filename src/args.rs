//! These structs provide the CLI interface for the coverage CLI.

use crate::model::{CoverageMode, InstrumentKind};
use crate::utils::parse_date;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// coverage: tracks whether enough financial statements have been uploaded for a claim.
///
/// A claim needs bank account and credit card statements for the months leading up to the
/// accident date (three months by default). Register each account or card with `coverage
/// instrument add`, upload statements with the date range they cover, and run `coverage report`
/// to see which months still have missing days.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and the statement database.
    ///
    /// By default the data directory is $HOME/coverage. Pass --coverage-home or set
    /// COVERAGE_HOME to put it somewhere else.
    Init,
    /// Add, list or delete bank accounts and credit cards.
    Instrument(InstrumentArgs),
    /// Upload, list, download or delete statements.
    Statement(StatementArgs),
    /// Report, per calendar month, how much of the required period is covered by statements.
    Report(ReportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where statements, the database and configuration are held. Defaults to
    /// ~/coverage
    #[arg(long, env = "COVERAGE_HOME", default_value_t = default_coverage_home())]
    coverage_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, coverage_home: PathBuf) -> Self {
        Self {
            log_level,
            coverage_home: coverage_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn coverage_home(&self) -> &DisplayPath {
        &self.coverage_home
    }
}

/// (Not shown): Args for the `coverage instrument` command.
#[derive(Debug, Parser, Clone)]
pub struct InstrumentArgs {
    #[command(subcommand)]
    command: InstrumentCommand,
}

impl InstrumentArgs {
    pub fn new(command: InstrumentCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &InstrumentCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum InstrumentCommand {
    /// Register a bank account or credit card.
    Add(AddInstrumentArgs),
    /// List registered instruments.
    List,
    /// Delete an instrument together with all of its statements and their files.
    Delete(IdArgs),
}

/// (Not shown): Args for the `coverage instrument add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddInstrumentArgs {
    /// Whether this is a bank account or a credit card.
    #[arg(long, value_enum, default_value_t = InstrumentKind::BankAccount)]
    kind: InstrumentKind,

    /// A name to recognize the instrument by, e.g. "Joint checking".
    #[arg(long)]
    name: String,

    /// The bank or card issuer.
    #[arg(long)]
    institution: Option<String>,

    /// The accident date of the claim, YYYY-MM-DD. When given, uploads and deletes report the
    /// coverage of the months leading up to it.
    #[arg(long, value_parser = parse_date)]
    accident_date: Option<NaiveDate>,
}

impl AddInstrumentArgs {
    pub fn new(kind: InstrumentKind, name: impl Into<String>, institution: Option<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            institution,
            accident_date: None,
        }
    }

    pub fn with_accident_date(mut self, accident_date: NaiveDate) -> Self {
        self.accident_date = Some(accident_date);
        self
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn institution(&self) -> Option<&str> {
        self.institution.as_deref()
    }

    pub fn accident_date(&self) -> Option<NaiveDate> {
        self.accident_date
    }
}

/// (Not shown): Args naming a single instrument or statement by ID.
#[derive(Debug, Parser, Clone)]
pub struct IdArgs {
    /// The ID, as shown by the corresponding `list` command.
    id: String,
}

impl IdArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// (Not shown): Args for the `coverage statement` command.
#[derive(Debug, Parser, Clone)]
pub struct StatementArgs {
    #[command(subcommand)]
    command: StatementCommand,
}

impl StatementArgs {
    pub fn new(command: StatementCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &StatementCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum StatementCommand {
    /// Store a statement file along with the dates it covers.
    Upload(UploadArgs),
    /// List the statements of an instrument.
    List(ListStatementsArgs),
    /// Copy a stored statement file out of the data directory.
    Download(DownloadArgs),
    /// Delete a statement and its stored file.
    Delete(IdArgs),
}

/// (Not shown): Args for the `coverage statement upload` command.
#[derive(Debug, Parser, Clone)]
pub struct UploadArgs {
    /// The ID of the instrument the statement belongs to.
    #[arg(long)]
    instrument: String,

    /// The statement document, e.g. a PDF downloaded from the bank.
    #[arg(long)]
    file: PathBuf,

    /// The first day covered by the statement, YYYY-MM-DD.
    #[arg(long, value_parser = parse_date)]
    start: NaiveDate,

    /// The last day covered by the statement, YYYY-MM-DD.
    #[arg(long, value_parser = parse_date)]
    end: NaiveDate,
}

impl UploadArgs {
    pub fn new(
        instrument: impl Into<String>,
        file: impl Into<PathBuf>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            file: file.into(),
            start,
            end,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// (Not shown): Args for the `coverage statement list` command.
#[derive(Debug, Parser, Clone)]
pub struct ListStatementsArgs {
    /// The ID of the instrument.
    #[arg(long)]
    instrument: String,
}

impl ListStatementsArgs {
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }
}

/// (Not shown): Args for the `coverage statement download` command.
#[derive(Debug, Parser, Clone)]
pub struct DownloadArgs {
    /// The ID of the statement.
    id: String,

    /// Where to write the file. If this is a directory, the original file name is used.
    #[arg(long, default_value = ".")]
    dest: PathBuf,
}

impl DownloadArgs {
    pub fn new(id: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            dest: dest.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }
}

/// How the report is written to stdout.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// A table per instrument.
    #[default]
    Text,
    /// Pretty printed JSON.
    Json,
    /// One CSV row per month and instrument.
    Csv,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

/// (Not shown): Args for the `coverage report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// The accident date, YYYY-MM-DD. Statements are required for the months leading up to it.
    #[arg(long, value_parser = parse_date)]
    accident_date: NaiveDate,

    /// Only report on this instrument. By default all instruments are reported.
    #[arg(long)]
    instrument: Option<String>,

    /// How many months of statements are required. Defaults to the configured value.
    #[arg(long)]
    months: Option<u32>,

    /// How overlapping statements are counted. Defaults to the configured value.
    #[arg(long, value_enum)]
    mode: Option<CoverageMode>,

    /// The output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ReportArgs {
    pub fn new(accident_date: NaiveDate) -> Self {
        Self {
            accident_date,
            instrument: None,
            months: None,
            mode: None,
            format: OutputFormat::Text,
        }
    }

    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    pub fn with_months(mut self, months: u32) -> Self {
        self.months = Some(months);
        self
    }

    pub fn with_mode(mut self, mode: CoverageMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn accident_date(&self) -> NaiveDate {
        self.accident_date
    }

    pub fn instrument(&self) -> Option<&str> {
        self.instrument.as_deref()
    }

    pub fn months(&self) -> Option<u32> {
        self.months
    }

    pub fn mode(&self) -> Option<CoverageMode> {
        self.mode
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

fn default_coverage_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("coverage"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --coverage-home or COVERAGE_HOME instead of relying on the \
                default coverage home directory.",
            );
            PathBuf::from("coverage")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
