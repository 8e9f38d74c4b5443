use std::path::Path;

use crate::error::Result;
use crate::importer::Column;
use crate::models::{EnrichedInvoice, InvoiceRecord};
use crate::sheet::{write_sheet, Cell, Sheet};

/// Worksheet name used for every invoice export.
pub const SHEET_NAME: &str = "Facturas";

/// Headers of the derived columns, appended after the input columns.
pub const DERIVED_HEADERS: [&str; 3] = ["Dias_al_Vencimiento", "Riesgo", "Haircut"];

/// Appended only when a rate table was loaded.
pub const RATE_HEADER: &str = "Tasa Aplicada";

fn invoice_cells(inv: &InvoiceRecord) -> Vec<Cell> {
    vec![
        Cell::text(inv.exporter.as_str()),
        Cell::text(inv.importer.as_str()),
        Cell::text(inv.product.as_str()),
        Cell::text(inv.destination.as_str()),
        Cell::opt_date(inv.issue_date),
        Cell::opt_date(inv.due_date),
        Cell::Number(inv.invoice_value),
        Cell::opt_number(inv.financed_amount),
        Cell::opt_number(inv.risk_score),
        Cell::text(inv.status.label()),
        Cell::text(inv.payment_status.as_ref().map(|p| p.label()).unwrap_or("")),
    ]
}

fn input_headers() -> Vec<String> {
    Column::ALL.iter().map(|c| c.header().to_string()).collect()
}

/// Raw invoice records, in the input layout.
pub fn invoice_sheet(records: &[InvoiceRecord]) -> Sheet {
    Sheet {
        headers: input_headers(),
        rows: records.iter().map(invoice_cells).collect(),
    }
}

/// The enriched view: input columns followed by the derived columns. The
/// rate column is omitted when `with_rates` is false.
pub fn enriched_sheet(rows: &[&EnrichedInvoice], with_rates: bool) -> Sheet {
    let mut headers = input_headers();
    headers.extend(DERIVED_HEADERS.iter().map(|h| h.to_string()));
    if with_rates {
        headers.push(RATE_HEADER.to_string());
    }
    let rows = rows
        .iter()
        .map(|r| {
            let mut cells = invoice_cells(&r.invoice);
            cells.push(Cell::Number(r.days_to_due as f64));
            cells.push(Cell::text(r.risk.label()));
            cells.push(Cell::Number(r.haircut));
            if with_rates {
                cells.push(Cell::opt_number(r.applied_rate));
            }
            cells
        })
        .collect();
    Sheet { headers, rows }
}

/// Write the filtered view to `path` (`.xlsx` or `.csv`). Returns the row count.
pub fn export_view(path: &Path, rows: &[&EnrichedInvoice], with_rates: bool) -> Result<usize> {
    write_sheet(path, SHEET_NAME, &enriched_sheet(rows, with_rates))?;
    tracing::debug!(file = %path.display(), rows = rows.len(), "exported view");
    Ok(rows.len())
}
