pub mod config;
pub mod demo;
pub mod export;
pub mod report;
pub mod status;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::error::{FactorError, Result};
use crate::filter::{Filter, Selection};
use crate::importer::load_invoices;
use crate::pipeline::Ledger;
use crate::rates::{load_rates, RateTable};
use crate::reports::Granularity;
use crate::settings::{load_settings, Settings};

#[derive(Parser)]
#[command(name = "factor", about = "Invoice-financing metrics from an invoice sheet and a rate table.")]
pub struct Cli {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Inputs and filters shared by every report.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Invoice sheet (.xlsx or .csv). Default: <data_dir>/facturas_ejemplo.xlsx
    #[arg(long, global = true)]
    pub invoices: Option<PathBuf>,
    /// Rate table sheet. Default: <data_dir>/estructura_tasas.xlsx
    #[arg(long, global = true)]
    pub rates: Option<PathBuf>,
    /// Reference date for days-to-due: YYYY-MM-DD or DD/MM/YYYY
    #[arg(long = "as-of", global = true)]
    pub as_of: Option<String>,
    /// Only this exporter ("All" for no filter)
    #[arg(long, global = true)]
    pub exporter: Option<String>,
    /// Only this importer ("All" for no filter)
    #[arg(long, global = true)]
    pub importer: Option<String>,
    /// Only this status, e.g. Financiada or Financed
    #[arg(long, global = true)]
    pub status: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Headline KPIs for the filtered invoices (default).
    Summary,
    /// Invoice value by risk bucket.
    Risk,
    /// Rate curve by risk bucket and tenor.
    Rates,
    /// Financed invoice value per product.
    Products,
    /// Financed invoice value per destination country.
    Destinations,
    /// Financed amount by due date.
    Flow {
        /// Bucket size
        #[arg(long, value_enum, default_value = "monthly")]
        period: Granularity,
        /// Start date (inclusive)
        #[arg(long)]
        from: Option<String>,
        /// End date (inclusive)
        #[arg(long)]
        to: Option<String>,
    },
    /// List the filtered invoices with their derived columns.
    Detail {
        /// Show at most this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the values available for --exporter, --importer and --status.
    Filters,
    /// Export the filtered invoices to .xlsx or .csv.
    Export {
        /// Output path (default: <data_dir>/exports/facturas_filtradas.xlsx)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show resolved inputs and load statistics.
    Status,
    /// Write sample invoice and rate sheets to the data directory.
    Demo,
    /// View or change settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current settings.
    Show,
    /// Update one or more settings.
    Set {
        /// Directory holding the input sheets and exports
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Default invoice sheet (relative to the data directory)
        #[arg(long = "invoices-file")]
        invoices_file: Option<String>,
        /// Default rate sheet (relative to the data directory)
        #[arg(long = "rates-file")]
        rates_file: Option<String>,
        /// Pin the reference date (YYYY-MM-DD); "today" clears it
        #[arg(long = "reference-date")]
        reference_date: Option<String>,
    },
}

/// Parse a date flag. ISO first, then the day-first sheet formats.
pub(crate) fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| crate::importer::parse_date_dmy(raw))
        .ok_or_else(|| FactorError::InvalidDate(raw.to_string()))
}

pub(crate) fn parse_opt_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(parse_date_arg).transpose()
}

/// `--as-of`, then the pinned settings date, then today.
pub(crate) fn resolve_reference_date(args: &DataArgs, settings: &Settings) -> Result<NaiveDate> {
    if let Some(raw) = args.as_of.as_deref().or(settings.reference_date.as_deref()) {
        return parse_date_arg(raw);
    }
    Ok(chrono::Local::now().date_naive())
}

pub(crate) fn invoices_path(args: &DataArgs, settings: &Settings) -> PathBuf {
    args.invoices.clone().unwrap_or_else(|| settings.invoices_path())
}

/// Rate table to use. An explicit path must exist; a missing default file
/// just disables the rate columns.
pub(crate) fn load_rate_table(args: &DataArgs, settings: &Settings) -> Result<Option<RateTable>> {
    match &args.rates {
        Some(path) if !path.exists() => Err(FactorError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("rate table not found: {}", path.display()),
        ))),
        Some(path) => load_rates(path).map(Some),
        None => {
            let path = settings.rates_path();
            if path.exists() {
                load_rates(&path).map(Some)
            } else {
                tracing::debug!(file = %path.display(), "no rate table, rates disabled");
                Ok(None)
            }
        }
    }
}

pub(crate) fn load_ledger(args: &DataArgs) -> Result<Ledger> {
    let settings = load_settings();
    let invoices = invoices_path(args, &settings);
    if !invoices.exists() {
        return Err(FactorError::NoInput(invoices.display().to_string()));
    }
    let reference_date = resolve_reference_date(args, &settings)?;
    let (records, _) = load_invoices(&invoices)?;
    let rates = load_rate_table(args, &settings)?;
    Ok(Ledger::build(&records, rates, reference_date))
}

pub(crate) fn filter_from(args: &DataArgs) -> Filter {
    Filter {
        exporter: Selection::from_arg(args.exporter.as_deref()),
        importer: Selection::from_arg(args.importer.as_deref()),
        status: Selection::from_arg(args.status.as_deref()),
    }
}
