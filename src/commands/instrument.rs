//! Instrument command handlers.

use crate::args::{AddInstrumentArgs, IdArgs};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::Instrument;
use crate::utils::generate_id;
use crate::{Config, Result};
use chrono::Utc;

/// Registers a bank account or credit card. A unique ID is generated and returned.
///
/// # Errors
///
/// - Returns an error if the name is blank.
/// - Returns an error if a database operation fails.
pub async fn add_instrument(config: Config, args: AddInstrumentArgs) -> Result<Out<Instrument>> {
    let name = args.name().trim();
    if name.is_empty() {
        return Err(ErrorType::Request.error("The instrument name cannot be blank"));
    }
    let instrument = Instrument {
        id: generate_id(),
        kind: args.kind(),
        name: name.to_string(),
        institution: args.institution().unwrap_or_default().trim().to_string(),
        accident_date: args.accident_date(),
        created_at: Utc::now(),
    };
    config
        .db()
        .insert_instrument(&instrument)
        .await
        .pub_result(ErrorType::Database)?;

    let message = format!(
        "Added {} with ID: {}",
        instrument.label(),
        instrument.id()
    );
    Ok(Out::new(message, instrument))
}

/// Lists all registered instruments, oldest first.
pub async fn list_instruments(config: Config) -> Result<Out<Vec<Instrument>>> {
    let instruments = config
        .db()
        .list_instruments()
        .await
        .pub_result(ErrorType::Database)?;

    let mut message = format!(
        "{} instrument{}",
        instruments.len(),
        if instruments.len() == 1 { "" } else { "s" }
    );
    for i in &instruments {
        message.push_str(&format!("\n  {}  {}", i.id(), i.label()));
        if !i.institution().is_empty() {
            message.push_str(&format!(", {}", i.institution()));
        }
        if let Some(accident_date) = i.accident_date() {
            message.push_str(&format!(", accident date {accident_date}"));
        }
    }
    Ok(Out::new(message, instruments))
}

/// Deletes an instrument along with all of its statements and their stored files. Returns the
/// IDs of the deleted statements.
pub async fn delete_instrument(config: Config, args: IdArgs) -> Result<Out<Vec<String>>> {
    let removed = config
        .store()
        .delete_instrument(args.id())
        .await
        .pub_result(ErrorType::Database)?;

    let ids: Vec<String> = removed.iter().map(|s| s.id().to_string()).collect();
    let message = format!(
        "Deleted instrument {} and {} statement{}",
        args.id(),
        ids.len(),
        if ids.len() == 1 { "" } else { "s" }
    );
    Ok(Out::new(message, ids))
}
