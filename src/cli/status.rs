use std::path::Path;

use crate::cli::{invoices_path, load_rate_table, resolve_reference_date, DataArgs};
use crate::error::Result;
use crate::importer::load_invoices;
use crate::pipeline::Ledger;
use crate::settings::{load_settings, settings_file_exists, settings_path};

fn describe(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (missing)", path.display())
    }
}

pub fn run(args: &DataArgs) -> Result<()> {
    let settings = load_settings();
    let invoices = invoices_path(args, &settings);
    let rates = args.rates.clone().unwrap_or_else(|| settings.rates_path());
    let reference_date = resolve_reference_date(args, &settings)?;

    let config = if settings_file_exists() { "" } else { " (defaults)" };
    println!("Settings:     {}{config}", settings_path().display());
    println!("Data dir:     {}", settings.data_dir);
    println!("Invoices:     {}", describe(&invoices));
    println!("Rates:        {}", describe(&rates));
    println!("As of:        {}", reference_date.format("%Y-%m-%d"));

    if !invoices.exists() {
        println!();
        println!("No invoice sheet found. Run `factor demo` or pass --invoices <FILE>.");
        return Ok(());
    }

    let (records, stats) = load_invoices(&invoices)?;
    let table = load_rate_table(args, &settings)?;
    let rate_rows = table.as_ref().map(|t| t.buckets().count()).unwrap_or(0);
    let ledger = Ledger::build(&records, table, reference_date);

    println!();
    println!("Rows read:     {}", stats.rows);
    println!("Blank rows:    {}", stats.blank_rows);
    println!("Bad dates:     {}", stats.bad_issue_dates + stats.bad_due_dates);
    println!("Bad scores:    {}", stats.scores_out_of_range);
    println!("Undated:       {}", ledger.undated);
    println!("Past due:      {}", ledger.past_due);
    println!("Open invoices: {}", ledger.rows.len());
    if ledger.has_rates() {
        println!("Rate rows:     {rate_rows}");
    } else {
        println!("Rate rows:     none (rate columns omitted)");
    }

    Ok(())
}
