//! Command-line front end for the `agri` binary.
//!
//! `src/main.rs` only maps the result of [`run`] to an exit code; this
//! module parses arguments, loads configuration and data, executes the
//! requested query and prints the JSON result.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::logger;
use crate::query::{QueryKind, QueryParams, QueryService};
use crate::snapshot::{load_snapshot, SnapshotStore};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "agri", version, about = "Agricultural market price analytics")]
pub struct Cli {
    /// Historical dataset (.db, .sqlite, .csv or .parquet); overrides DATABASE_PATH.
    #[arg(long, global = true)]
    pub historical: Option<PathBuf>,

    /// Forecast dataset; overrides PREDICTIONS_DATABASE_PATH.
    #[arg(long, global = true)]
    pub forecast: Option<PathBuf>,

    /// Log filter, e.g. `debug`; overrides AGRI_LOG.
    #[arg(long, global = true)]
    pub log: Option<String>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a named query, e.g. `kpis` or `price-for-date`.
    Query(QueryArgs),
    /// Report whether each dataset is loaded.
    Health,
    /// List the available query names.
    List,
}

/// Filters and scope of a query.
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Query name.
    pub name: String,

    /// State filter (repeatable or comma-separated).
    #[arg(long = "states", value_delimiter = ',')]
    pub states: Vec<String>,

    /// Market filter (repeatable or comma-separated).
    #[arg(long = "markets", value_delimiter = ',')]
    pub markets: Vec<String>,

    /// Commodity filter (repeatable or comma-separated).
    #[arg(long = "commodities", value_delimiter = ',')]
    pub commodities: Vec<String>,

    /// Inclusive start date, YYYY-MM-DD.
    #[arg(long)]
    pub start_date: Option<String>,

    /// Inclusive end date, YYYY-MM-DD.
    #[arg(long)]
    pub end_date: Option<String>,

    /// Commodity of a scoped query.
    #[arg(long)]
    pub commodity: Option<String>,

    /// Market of a scoped query; defaults to DEFAULT_MARKET.
    #[arg(long)]
    pub market: Option<String>,

    /// Target date of `price-for-date`.
    #[arg(long)]
    pub date: Option<String>,
}

impl From<QueryArgs> for QueryParams {
    fn from(args: QueryArgs) -> Self {
        QueryParams {
            states: args.states,
            markets: args.markets,
            commodities: args.commodities,
            start_date: args.start_date,
            end_date: args.end_date,
            commodity: args.commodity,
            market: args.market,
            date: args.date,
        }
    }
}

/// Entry point for the `agri` binary.
///
/// On failure the caller-safe error body has already been printed.
pub fn run() -> Result<(), ServiceError> {
    let cli = Cli::parse();
    let config = config_from_cli(&cli);

    if let Command::List = cli.command {
        let names: Vec<&str> = QueryKind::ALL.iter().map(|k| k.as_str()).collect();
        return print_json(&json!(names), cli.pretty);
    }

    logger::init_logging(&config.log_level);
    let store = Arc::new(SnapshotStore::new(load_snapshot(&config)));
    let service = QueryService::new(store, config);

    let (name, params) = match cli.command {
        Command::Query(args) => (args.name.clone(), QueryParams::from(args)),
        _ => (QueryKind::Health.as_str().to_string(), QueryParams::default()),
    };

    match service.execute(&name, &params) {
        Ok(value) => print_json(&value, cli.pretty),
        Err(err) => {
            print_json(&json!({ "error": err.public_message() }), cli.pretty)?;
            Err(err)
        }
    }
}

/// Environment config with command-line overrides applied.
pub fn config_from_cli(cli: &Cli) -> ServiceConfig {
    let mut config = ServiceConfig::from_env();
    if let Some(path) = &cli.historical {
        config = config.with_historical_source(path.clone());
    }
    if let Some(path) = &cli.forecast {
        config = config.with_forecast_source(path.clone());
    }
    if let Some(level) = &cli.log {
        config = config.with_log_level(level.clone());
    }
    config
}

fn print_json(value: &Value, pretty: bool) -> Result<(), ServiceError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}
