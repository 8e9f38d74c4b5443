use std::path::Path;

use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::exporter::invoice_sheet;
use crate::models::{InvoiceRecord, PaymentStatus, Status};
use crate::rates::{RateTable, TENOR_TIERS};
use crate::risk::RiskBucket;
use crate::settings::load_settings;
use crate::sheet::write_sheet;

const SEED: u64 = 20_250_601;
const INVOICE_COUNT: usize = 120;

const EXPORTERS: &[&str] = &[
    "Agrícola Los Andes",
    "Viña Santa Rita",
    "Frutícola del Sur",
    "Cobre Norte SpA",
    "Salmones Austral",
    "Nueces del Maule",
];

const IMPORTERS: &[&str] = &[
    "Global Foods Inc",
    "Nordic Trade AB",
    "Shanghai Imports Co",
    "Euro Wines GmbH",
    "Pacific Grocers LLC",
];

const PRODUCTS: &[&str] = &["Fruta", "Vino", "Otro", "Salmón"];

const DESTINATIONS: &[&str] = &["Estados Unidos", "China", "Alemania", "Suecia", "Japón"];

/// Status draw weights, out of 100.
const STATUS_WEIGHTS: &[(u32, Status)] = &[
    (55, Status::Financed),
    (20, Status::InProcess),
    (15, Status::Rejected),
    (10, Status::NotFinanceable),
];

/// Base rate (%) at the 30-day tier, in `RiskBucket::RATED` order.
const BASE_RATES: [f64; 5] = [1.2, 1.6, 2.1, 2.8, 3.6];
const RATE_STEP: f64 = 0.15;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn pick_status(rng: &mut StdRng) -> Status {
    let mut roll = rng.gen_range(0..100u32);
    for (weight, status) in STATUS_WEIGHTS {
        if roll < *weight {
            return status.clone();
        }
        roll -= weight;
    }
    Status::Financed
}

fn pick_payment(rng: &mut StdRng) -> PaymentStatus {
    match rng.gen_range(0..20u32) {
        0..=11 => PaymentStatus::Current,
        12..=15 => PaymentStatus::Paid,
        16..=17 => PaymentStatus::Late,
        18 => PaymentStatus::Delinquent,
        _ => PaymentStatus::Unpaid,
    }
}

/// Reproducible invoice sample around `today`: issued in the last 90 days,
/// due 30 to 180 days after issue, so a few are already past due.
pub fn generate_invoices(today: NaiveDate, count: usize) -> Vec<InvoiceRecord> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count)
        .map(|_| {
            let issue = today - chrono::Duration::days(rng.gen_range(0..90));
            let due = issue + chrono::Duration::days(rng.gen_range(30..=180));
            let value = round2(rng.gen_range(5_000.0..250_000.0));
            let status = pick_status(&mut rng);
            let financed = status == Status::Financed;
            let risk_score = if rng.gen_bool(0.05) {
                None
            } else {
                Some((rng.gen_range(1.0..10.0f64) * 10.0).round() / 10.0)
            };
            InvoiceRecord {
                exporter: pick(&mut rng, EXPORTERS).to_string(),
                importer: pick(&mut rng, IMPORTERS).to_string(),
                product: pick(&mut rng, PRODUCTS).to_string(),
                destination: pick(&mut rng, DESTINATIONS).to_string(),
                issue_date: Some(issue),
                due_date: Some(due),
                invoice_value: value,
                financed_amount: financed.then(|| round2(value * rng.gen_range(0.6..0.9))),
                risk_score,
                status,
                payment_status: financed.then(|| pick_payment(&mut rng)),
            }
        })
        .collect()
}

/// Rate table rising with risk and with tenor.
pub fn demo_rates() -> RateTable {
    let mut table = RateTable::new();
    for (bucket, base) in RiskBucket::RATED.into_iter().zip(BASE_RATES) {
        for (step, tier) in TENOR_TIERS.iter().enumerate() {
            table.insert(bucket, *tier, round2(base + RATE_STEP * step as f64));
        }
    }
    table
}

/// Write both sample sheets. Returns the number of invoices written.
pub fn write_demo(invoices: &Path, rates: &Path, today: NaiveDate) -> Result<usize> {
    let records = generate_invoices(today, INVOICE_COUNT);
    write_sheet(invoices, "Facturas", &invoice_sheet(&records))?;
    write_sheet(rates, "Tasas", &demo_rates().to_sheet())?;
    Ok(records.len())
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    let invoices = settings.invoices_path();
    let rates = settings.rates_path();

    if invoices.exists() {
        println!("Sample data already present at {}", invoices.display());
        println!("Delete it first to regenerate.");
        return Ok(());
    }

    let count = write_demo(&invoices, &rates, Local::now().date_naive())?;

    println!("Demo data written!");
    println!("  Invoices: {} ({count} rows)", invoices.display());
    println!("  Rates:    {}", rates.display());
    println!();
    println!("Try these next:");
    println!("  factor summary");
    println!("  factor risk");
    println!("  factor flow --period weekly");
    println!("  factor filters");
    println!("  factor export");

    Ok(())
}
