use std::path::Path;

use chrono::NaiveDate;

use crate::error::{FactorError, Result};

/// Day-first rendering used whenever a date is written back out.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn opt_number(v: Option<f64>) -> Self {
        v.map(Cell::Number).unwrap_or(Cell::Empty)
    }

    pub fn opt_date(d: Option<NaiveDate>) -> Self {
        d.map(Cell::Date).unwrap_or(Cell::Empty)
    }

    /// Plain-text rendering, as written to CSV.
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }
}

pub static EMPTY_CELL: Cell = Cell::Empty;

/// A single worksheet: one header row plus data rows. Rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Convert an Excel serial day number to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn is_workbook(ext: &str) -> bool {
    matches!(ext, "xlsx" | "xlsm" | "xls" | "xlsb" | "ods")
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

pub fn read_sheet(path: &Path) -> Result<Sheet> {
    let ext = extension(path);
    if ext == "csv" {
        return read_csv(path);
    }
    if is_workbook(&ext) {
        return read_workbook(path);
    }
    Err(FactorError::UnsupportedFormat(format!(
        "{} (expected .csv or .xlsx)",
        path.display()
    )))
}

fn read_csv(path: &Path) -> Result<Sheet> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut sheet = Sheet::default();
    let mut found_header = false;
    for result in rdr.records() {
        let record = result?;
        if !found_header {
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            sheet.headers = record
                .iter()
                .map(|f| f.trim_start_matches('\u{feff}').to_string())
                .collect();
            found_header = true;
            continue;
        }
        sheet.rows.push(record.iter().map(Cell::text).collect());
    }
    Ok(sheet)
}

#[cfg(feature = "xlsx")]
fn read_workbook(path: &Path) -> Result<Sheet> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| FactorError::Workbook(format!("Failed to open {}: {e}", path.display())))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FactorError::Workbook(format!("{} has no worksheets", path.display())))?
        .map_err(|e| FactorError::Workbook(e.to_string()))?;

    let convert = |data: &Data| match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::text(s.as_str()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => Cell::text(s.as_str()),
        _ => Cell::Empty,
    };

    let mut rows = range.rows().skip_while(|r| r.iter().all(|c| matches!(c, Data::Empty)));
    let Some(header_row) = rows.next() else {
        return Ok(Sheet::default());
    };
    let headers: Vec<String> = header_row.iter().map(|c| convert(c).render()).collect();
    let rows: Vec<Vec<Cell>> = rows
        .map(|r| r.iter().map(convert).collect::<Vec<_>>())
        .collect();
    Ok(Sheet { headers, rows })
}

#[cfg(not(feature = "xlsx"))]
fn read_workbook(path: &Path) -> Result<Sheet> {
    Err(FactorError::UnsupportedFormat(format!(
        "{} (built without xlsx support)",
        path.display()
    )))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write `sheet` to `path`; the extension picks CSV or XLSX. Workbooks get a
/// single worksheet named `sheet_name` and no index column.
pub fn write_sheet(path: &Path, sheet_name: &str, sheet: &Sheet) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let ext = extension(path);
    if ext == "csv" {
        return write_csv(path, sheet);
    }
    if ext == "xlsx" {
        return write_workbook(path, sheet_name, sheet);
    }
    Err(FactorError::UnsupportedFormat(format!(
        "{} (expected .csv or .xlsx)",
        path.display()
    )))
}

fn write_csv(path: &Path, sheet: &Sheet) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    wtr.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        wtr.write_record(row.iter().map(Cell::render))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(feature = "xlsx")]
fn write_workbook(path: &Path, sheet_name: &str, sheet: &Sheet) -> Result<()> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let date_fmt = Format::new().set_num_format("dd/mm/yyyy");
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header.as_str(), &bold)?;
    }
    for (i, row) in sheet.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                Cell::Date(d) => {
                    worksheet.write_date_with_format(r, c, d, &date_fmt)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string(r, c, s.as_str())?;
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

#[cfg(not(feature = "xlsx"))]
fn write_workbook(path: &Path, _sheet_name: &str, _sheet: &Sheet) -> Result<()> {
    Err(FactorError::UnsupportedFormat(format!(
        "{} (built without xlsx support)",
        path.display()
    )))
}
