use std::path::Path;

use chrono::NaiveDate;

use crate::error::{FactorError, Result};
use crate::models::{InvoiceRecord, PaymentStatus, Status};
use crate::sheet::{excel_serial_to_date, read_sheet, Cell, Sheet, EMPTY_CELL};

// ---------------------------------------------------------------------------
// Column vocabulary
// ---------------------------------------------------------------------------

pub const ISSUE_DATE_RAW: &str = "Fecha Emisión";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Exporter,
    Importer,
    Product,
    Destination,
    IssueDate,
    DueDate,
    InvoiceValue,
    FinancedAmount,
    RiskScore,
    Status,
    PaymentStatus,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Exporter,
        Column::Importer,
        Column::Product,
        Column::Destination,
        Column::IssueDate,
        Column::DueDate,
        Column::InvoiceValue,
        Column::FinancedAmount,
        Column::RiskScore,
        Column::Status,
        Column::PaymentStatus,
    ];

    /// Header written on export; also the first accepted alias on import.
    pub fn header(&self) -> &'static str {
        self.aliases()[0]
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Exporter => &["Exportador", "Exporter"],
            Self::Importer => &["Importador", "Importer"],
            Self::Product => &["Producto", "Product"],
            Self::Destination => &["País de Destino", "Pais de Destino", "Destination country", "Destination"],
            Self::IssueDate => &["Fecha_Emision", "Issue Date", "IssueDate"],
            Self::DueDate => &["Fecha_Vencimiento", "Fecha Vencimiento", "Due Date", "DueDate"],
            Self::InvoiceValue => &["Valor Factura (USD)", "Invoice Value (USD)", "InvoiceValueUSD"],
            Self::FinancedAmount => &["Monto Financiado (USD)", "Financed Amount (USD)", "FinancedAmountUSD"],
            Self::RiskScore => &["Score Riesgo", "Risk Score", "RiskScore"],
            Self::Status => &["Estado", "Status"],
            Self::PaymentStatus => &["Estado de Pago", "Payment Status", "PaymentStatus"],
        }
    }

    fn is_required(&self) -> bool {
        matches!(
            self,
            Self::Exporter | Self::Importer | Self::Status | Self::InvoiceValue | Self::DueDate
        )
    }

    fn locate(&self, sheet: &Sheet) -> Option<usize> {
        self.aliases().iter().find_map(|alias| {
            sheet
                .headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(alias))
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a money amount. Accepts thousands separators, `$`, and
/// parenthesized negatives. Blank or garbage input is `None`.
///
/// Both decimal conventions are read: `1,234.56` and `1.234,56` are the same
/// amount, and a single comma followed by one or two digits (`6,5`) is a
/// decimal comma.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace(['"', '$'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_amount(inner).map(|v| -v);
    }
    normalize_separators(s).parse().ok()
}

/// Rewrite `s` with `.` as the only decimal mark and no digit grouping.
fn normalize_separators(s: &str) -> String {
    match (s.rfind(','), s.rfind('.')) {
        // Whichever separator comes last is the decimal mark.
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(comma), None) => {
            let decimals = s.len() - comma - 1;
            if s.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (None, Some(_)) if s.matches('.').count() > 1 => s.replace('.', ""),
        _ => s.to_string(),
    }
}

// Two-digit years first: chrono's `%Y` would read "25" as year 25.
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

/// Parse a date with day-first precedence: `03/07/2025` is 3 July.
pub fn parse_date_dmy(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DAY_FIRST_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.trim().to_string(),
        Cell::Empty => String::new(),
        other => other.render(),
    }
}

fn cell_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_amount(s).filter(|n| n.is_finite()),
        _ => None,
    }
}

fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => excel_serial_to_date(*n),
        Cell::Text(s) => parse_date_dmy(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Trim header whitespace and rename the raw issue-date header.
pub fn normalize_headers(sheet: &mut Sheet) {
    for header in sheet.headers.iter_mut() {
        let trimmed = header.trim();
        *header = if trimmed == ISSUE_DATE_RAW {
            Column::IssueDate.header().to_string()
        } else {
            trimmed.to_string()
        };
    }
}

/// Column index per [`Column`], indexed by discriminant.
type ColumnMap = [Option<usize>; 11];

fn map_columns(sheet: &Sheet) -> Result<ColumnMap> {
    let mut map: ColumnMap = [None; 11];
    for (slot, column) in map.iter_mut().zip(Column::ALL) {
        *slot = column.locate(sheet);
        if slot.is_none() && column.is_required() {
            return Err(FactorError::MissingColumn(column.header().to_string()));
        }
    }
    Ok(map)
}

fn field<'a>(sheet: &'a Sheet, map: &ColumnMap, row: usize, column: Column) -> &'a Cell {
    match map[column as usize] {
        Some(col) => sheet.cell(row, col),
        None => &EMPTY_CELL,
    }
}

/// Stats gathered while parsing, for logging and `status`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParseStats {
    pub rows: usize,
    pub blank_rows: usize,
    pub bad_issue_dates: usize,
    pub bad_due_dates: usize,
    /// Scores outside `[0, MAX_RISK_SCORE]`, usually a misread separator.
    pub scores_out_of_range: usize,
}

/// Upper end of the risk-score scale.
pub const MAX_RISK_SCORE: f64 = 10.0;

/// Build invoice records from a normalized sheet. Rows are kept even when
/// their dates fail to parse; only fully blank rows are skipped.
pub fn parse_invoices(sheet: &Sheet) -> Result<(Vec<InvoiceRecord>, ParseStats)> {
    let map = map_columns(sheet)?;
    let get = |row: usize, column: Column| field(sheet, &map, row, column);

    let mut stats = ParseStats::default();
    let mut records = Vec::with_capacity(sheet.rows.len());
    for (i, row) in sheet.rows.iter().enumerate() {
        if row.iter().all(Cell::is_empty) {
            stats.blank_rows += 1;
            continue;
        }

        let issue_cell = get(i, Column::IssueDate);
        let issue_date = cell_date(issue_cell);
        if issue_date.is_none() && !issue_cell.is_empty() {
            stats.bad_issue_dates += 1;
        }
        let due_cell = get(i, Column::DueDate);
        let due_date = cell_date(due_cell);
        if due_date.is_none() && !due_cell.is_empty() {
            stats.bad_due_dates += 1;
        }

        let risk_score = cell_number(get(i, Column::RiskScore));
        if risk_score.is_some_and(|s| !(0.0..=MAX_RISK_SCORE).contains(&s)) {
            stats.scores_out_of_range += 1;
        }

        let payment = cell_text(get(i, Column::PaymentStatus));
        records.push(InvoiceRecord {
            exporter: cell_text(get(i, Column::Exporter)),
            importer: cell_text(get(i, Column::Importer)),
            product: cell_text(get(i, Column::Product)),
            destination: cell_text(get(i, Column::Destination)),
            issue_date,
            due_date,
            invoice_value: cell_number(get(i, Column::InvoiceValue)).unwrap_or(0.0),
            financed_amount: cell_number(get(i, Column::FinancedAmount)),
            risk_score,
            status: Status::parse(&cell_text(get(i, Column::Status))),
            payment_status: (!payment.is_empty()).then(|| PaymentStatus::parse(&payment)),
        });
    }
    stats.rows = records.len();
    Ok((records, stats))
}

// ---------------------------------------------------------------------------
// load_invoices
// ---------------------------------------------------------------------------

pub fn load_invoices(path: &Path) -> Result<(Vec<InvoiceRecord>, ParseStats)> {
    let mut sheet = read_sheet(path)?;
    normalize_headers(&mut sheet);
    let (records, stats) = parse_invoices(&sheet)?;
    if stats.bad_issue_dates + stats.bad_due_dates > 0 {
        tracing::warn!(
            file = %path.display(),
            issue = stats.bad_issue_dates,
            due = stats.bad_due_dates,
            "unparseable dates set to empty"
        );
    }
    if stats.scores_out_of_range > 0 {
        tracing::warn!(
            file = %path.display(),
            count = stats.scores_out_of_range,
            "risk scores outside 0-10"
        );
    }
    tracing::debug!(file = %path.display(), rows = stats.rows, "loaded invoices");
    Ok((records, stats))
}
