//! Types that represent the core data model, such as `StatementRecord` and `CoverageResult`.
mod coverage;
mod instrument;
mod period;
mod report;
mod statement;

pub use coverage::{CoverageMode, CoverageResult, MonthBucket, OverallStatus};
pub use instrument::{HasStatements, Instrument, InstrumentKind, InstrumentStatements};
pub use period::{inclusive_days, RequiredPeriod, DEFAULT_LOOKBACK_MONTHS};
pub use report::{reports_to_csv, CoverageReport};
pub use statement::{validate_statements, StatementRecord};
