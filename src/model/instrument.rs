use crate::model::StatementRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The kind of financial instrument that statements are uploaded for.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    #[default]
    BankAccount,
    CreditCard,
}

serde_plain::derive_display_from_serialize!(InstrumentKind);
serde_plain::derive_fromstr_from_deserialize!(InstrumentKind);

/// A bank account or credit card belonging to a claimant.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Instrument {
    pub(crate) id: String,
    pub(crate) kind: InstrumentKind,
    pub(crate) name: String,
    pub(crate) institution: String,
    /// The accident date of the claim this instrument is evidence for, when known.
    pub(crate) accident_date: Option<NaiveDate>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Instrument {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn institution(&self) -> &str {
        &self.institution
    }

    pub fn accident_date(&self) -> Option<NaiveDate> {
        self.accident_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// A short human readable label, e.g. `Checking (bank_account)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.kind)
    }
}

/// Anything that owns a list of date-ranged statements can be reconciled.
pub trait HasStatements {
    /// A label used in logs and reports.
    fn label(&self) -> String;

    fn statements(&self) -> &[StatementRecord];
}

/// An instrument together with a snapshot of its statements.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct InstrumentStatements {
    instrument: Instrument,
    statements: Vec<StatementRecord>,
}

impl InstrumentStatements {
    pub fn new(instrument: Instrument, statements: Vec<StatementRecord>) -> Self {
        Self {
            instrument,
            statements,
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }
}

impl HasStatements for InstrumentStatements {
    fn label(&self) -> String {
        self.instrument.label()
    }

    fn statements(&self) -> &[StatementRecord] {
        &self.statements
    }
}
