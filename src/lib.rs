//! Tracks whether enough bank account and credit card statements have been uploaded to cover the
//! months leading up to an accident date.
//!
//! The core of the crate is [`reconcile`], which splits a required period into calendar-month
//! buckets and measures how many days of each bucket the uploaded statements cover. Everything
//! else stores instruments, statements and their files so that the reconciliation can be rerun
//! whenever a statement is added or removed.

pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
pub mod model;
pub mod reconcile;
pub mod store;
mod utils;


pub use config::Config;
pub use error::{Error, ErrorType, InvalidRangeError, IntoResult, Result};
pub use utils::parse_date;
