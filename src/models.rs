use chrono::NaiveDate;

use crate::risk::RiskBucket;

/// Lifecycle status of an invoice as recorded in the `Estado` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Financed,
    InProcess,
    Rejected,
    NotFinanceable,
    Other(String),
}

impl Status {
    /// Accepts the sheet vocabulary (`Financiada`, `En Proceso`, ...) as well as
    /// English aliases. Anything else is kept verbatim.
    pub fn parse(raw: &str) -> Self {
        let key = fold(raw);
        match key.as_str() {
            "financiada" | "financed" => Self::Financed,
            "en proceso" | "enproceso" | "in process" | "inprocess" => Self::InProcess,
            "rechazada" | "rejected" => Self::Rejected,
            "no financiable" | "nofinanciable" | "not financeable" | "notfinanceable" => {
                Self::NotFinanceable
            }
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Financed => "Financiada",
            Self::InProcess => "En Proceso",
            Self::Rejected => "Rechazada",
            Self::NotFinanceable => "No Financiable",
            Self::Other(raw) => raw,
        }
    }

    /// Statuses that were considered for financing at all.
    pub fn is_financeable(&self) -> bool {
        matches!(self, Self::Financed | Self::InProcess | Self::Rejected)
    }
}

/// Repayment state of a financed invoice (`Estado de Pago`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Current,
    Paid,
    Late,
    Delinquent,
    Unpaid,
    Other(String),
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        let key = fold(raw);
        match key.as_str() {
            "vigente" | "current" => Self::Current,
            "pagada" | "paid" => Self::Paid,
            "atrasada" | "late" => Self::Late,
            "morosa" | "delinquent" => Self::Delinquent,
            "impaga" | "unpaid" => Self::Unpaid,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Current => "Vigente",
            Self::Paid => "Pagada",
            Self::Late => "Atrasada",
            Self::Delinquent => "Morosa",
            Self::Unpaid => "Impaga",
            Self::Other(raw) => raw,
        }
    }
}

fn fold(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One normalized row of the invoice sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRecord {
    pub exporter: String,
    pub importer: String,
    pub product: String,
    pub destination: String,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub invoice_value: f64,
    pub financed_amount: Option<f64>,
    pub risk_score: Option<f64>,
    pub status: Status,
    pub payment_status: Option<PaymentStatus>,
}

/// An invoice plus the columns derived against a reference date.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedInvoice {
    pub invoice: InvoiceRecord,
    pub days_to_due: i64,
    pub risk: RiskBucket,
    pub haircut: f64,
    /// Fraction, not percent. `None` when the rate table has no entry.
    pub applied_rate: Option<f64>,
}

impl EnrichedInvoice {
    pub fn is_financed(&self) -> bool {
        self.invoice.status == Status::Financed
    }

    pub fn financed_amount(&self) -> f64 {
        self.invoice.financed_amount.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_sheet_vocabulary() {
        assert_eq!(Status::parse("Financiada"), Status::Financed);
        assert_eq!(Status::parse("  En Proceso "), Status::InProcess);
        assert_eq!(Status::parse("RECHAZADA"), Status::Rejected);
        assert_eq!(Status::parse("No Financiable"), Status::NotFinanceable);
    }

    #[test]
    fn test_status_parse_english_aliases() {
        assert_eq!(Status::parse("Financed"), Status::Financed);
        assert_eq!(Status::parse("InProcess"), Status::InProcess);
        assert_eq!(Status::parse("NotFinanceable"), Status::NotFinanceable);
    }

    #[test]
    fn test_status_other_keeps_raw_label() {
        let s = Status::parse(" Cancelada ");
        assert_eq!(s, Status::Other("Cancelada".to_string()));
        assert_eq!(s.label(), "Cancelada");
        assert!(!s.is_financeable());
    }

    #[test]
    fn test_financeable_statuses() {
        assert!(Status::Financed.is_financeable());
        assert!(Status::InProcess.is_financeable());
        assert!(Status::Rejected.is_financeable());
        assert!(!Status::NotFinanceable.is_financeable());
    }

    #[test]
    fn test_payment_status_roundtrips_label() {
        for label in ["Vigente", "Pagada", "Atrasada", "Morosa", "Impaga"] {
            assert_eq!(PaymentStatus::parse(label).label(), label);
        }
        assert_eq!(PaymentStatus::parse("late"), PaymentStatus::Late);
    }
}
