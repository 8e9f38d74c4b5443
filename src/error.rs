use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[cfg(feature = "xlsx")]
    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid date: {0} (expected YYYY-MM-DD or DD/MM/YYYY)")]
    InvalidDate(String),

    #[error("No invoice file found at {0}\nPass --invoices <FILE> or run `factor demo` to create sample data.")]
    NoInput(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FactorError>;
