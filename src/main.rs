use clap::Parser;
use statement_coverage::args::{Args, Command, InstrumentCommand, StatementCommand};
use statement_coverage::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().coverage_home().path();

    let _: () = match args.command() {
        Command::Init => commands::init(home).await?.print(),

        Command::Instrument(instrument_args) => {
            let config = Config::load(home).await?;
            match instrument_args.command() {
                InstrumentCommand::Add(args) => commands::add_instrument(config, args.clone())
                    .await?
                    .print(),
                InstrumentCommand::List => commands::list_instruments(config).await?.print(),
                InstrumentCommand::Delete(args) => {
                    commands::delete_instrument(config, args.clone())
                        .await?
                        .print()
                }
            }
        }

        Command::Statement(statement_args) => {
            let config = Config::load(home).await?;
            match statement_args.command() {
                StatementCommand::Upload(args) => commands::upload_statement(config, args.clone())
                    .await?
                    .print(),
                StatementCommand::List(args) => commands::list_statements(config, args.clone())
                    .await?
                    .print(),
                StatementCommand::Download(args) => {
                    commands::download_statement(config, args.clone())
                        .await?
                        .print()
                }
                StatementCommand::Delete(args) => commands::delete_statement(config, args.clone())
                    .await?
                    .print(),
            }
        }

        // The report itself goes to stdout so it can be redirected; the summary is logged.
        Command::Report(report_args) => {
            let config = Config::load(home).await?;
            let out = commands::report(config, report_args.clone()).await?;
            let reports = out.structure().map(Vec::as_slice).unwrap_or_default();
            println!("{}", commands::render(reports, report_args.format())?);
            out.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "statement_coverage={},{}={}",
                level,
                env!("CARGO_CRATE_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
