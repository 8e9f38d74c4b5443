use std::path::PathBuf;

use crate::cli::{filter_from, load_ledger, DataArgs};
use crate::error::Result;
use crate::exporter::export_view;
use crate::settings::load_settings;

#[cfg(feature = "xlsx")]
const DEFAULT_NAME: &str = "facturas_filtradas.xlsx";
#[cfg(not(feature = "xlsx"))]
const DEFAULT_NAME: &str = "facturas_filtradas.csv";

fn default_output() -> PathBuf {
    load_settings().exports_dir().join(DEFAULT_NAME)
}

pub fn run(args: &DataArgs, output: Option<PathBuf>) -> Result<()> {
    let ledger = load_ledger(args)?;
    let view = ledger.view(&filter_from(args));
    let path = output.unwrap_or_else(default_output);
    let written = export_view(&path, &view, ledger.has_rates())?;
    println!("Exported {written} invoices to {}", path.display());
    Ok(())
}
