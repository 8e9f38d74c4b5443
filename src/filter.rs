use std::collections::BTreeSet;

use crate::models::{EnrichedInvoice, Status};

/// One categorical filter: either a wildcard or a single value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// `None`, blank, `All`, `Todos` and `*` all mean no filtering.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg.map(str::trim) {
            None | Some("") | Some("*") => Self::All,
            Some(v) if v.eq_ignore_ascii_case("all") || v.eq_ignore_ascii_case("todos") => Self::All,
            Some(v) => Self::Only(v.to_string()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == value,
        }
    }

    fn matches_status(&self, status: &Status) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => Status::parse(wanted) == *status,
        }
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Only(v) => write!(f, "{v}"),
        }
    }
}

/// Conjunction of equality filters over exporter, importer and status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub exporter: Selection,
    pub importer: Selection,
    pub status: Selection,
}

impl Filter {
    pub fn matches(&self, row: &EnrichedInvoice) -> bool {
        self.exporter.matches(&row.invoice.exporter)
            && self.importer.matches(&row.invoice.importer)
            && self.status.matches_status(&row.invoice.status)
    }

    /// Rows passing every active predicate, in input order. Accepts the base
    /// table or a previous view, so filters compose.
    pub fn apply<'a, I>(&self, rows: I) -> Vec<&'a EnrichedInvoice>
    where
        I: IntoIterator<Item = &'a EnrichedInvoice>,
    {
        rows.into_iter().filter(|r| self.matches(r)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.exporter.is_all() && self.importer.is_all() && self.status.is_all()
    }
}

/// Distinct values offered for each filter, sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub exporters: Vec<String>,
    pub importers: Vec<String>,
    pub statuses: Vec<String>,
}

pub fn filter_options(rows: &[EnrichedInvoice]) -> FilterOptions {
    let mut exporters = BTreeSet::new();
    let mut importers = BTreeSet::new();
    let mut statuses = BTreeSet::new();
    for row in rows {
        let inv = &row.invoice;
        if !inv.exporter.is_empty() {
            exporters.insert(inv.exporter.clone());
        }
        if !inv.importer.is_empty() {
            importers.insert(inv.importer.clone());
        }
        if !inv.status.label().is_empty() {
            statuses.insert(inv.status.label().to_string());
        }
    }
    FilterOptions {
        exporters: exporters.into_iter().collect(),
        importers: importers.into_iter().collect(),
        statuses: statuses.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceRecord;
    use crate::risk::RiskBucket;

    fn row(exporter: &str, importer: &str, status: Status) -> EnrichedInvoice {
        EnrichedInvoice {
            invoice: InvoiceRecord {
                exporter: exporter.into(),
                importer: importer.into(),
                product: "Vino".into(),
                destination: "Peru".into(),
                issue_date: None,
                due_date: None,
                invoice_value: 100.0,
                financed_amount: None,
                risk_score: None,
                status,
                payment_status: None,
            },
            days_to_due: 10,
            risk: RiskBucket::Unknown,
            haircut: 0.2,
            applied_rate: None,
        }
    }

    fn rows() -> Vec<EnrichedInvoice> {
        vec![
            row("Acme", "Globex", Status::Financed),
            row("Acme", "Initech", Status::Rejected),
            row("Borealis", "Globex", Status::Financed),
            row("Borealis", "Globex", Status::InProcess),
        ]
    }

    #[test]
    fn test_selection_from_arg() {
        assert_eq!(Selection::from_arg(None), Selection::All);
        assert_eq!(Selection::from_arg(Some("Todos")), Selection::All);
        assert_eq!(Selection::from_arg(Some("all")), Selection::All);
        assert_eq!(Selection::from_arg(Some(" * ")), Selection::All);
        assert_eq!(Selection::from_arg(Some("Acme")), Selection::Only("Acme".into()));
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let data = rows();
        assert!(Filter::default().is_empty());
        assert_eq!(Filter::default().apply(&data).len(), 4);
    }

    #[test]
    fn test_filters_compose_conjunctively() {
        let data = rows();
        let filter = Filter {
            exporter: Selection::Only("Borealis".into()),
            importer: Selection::Only("Globex".into()),
            status: Selection::Only("Financiada".into()),
        };
        let view = filter.apply(&data);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].invoice.status, Status::Financed);
    }

    #[test]
    fn test_status_filter_accepts_english_alias() {
        let data = rows();
        let filter = Filter {
            status: Selection::Only("Financed".into()),
            ..Filter::default()
        };
        assert_eq!(filter.apply(&data).len(), 2);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let data = rows();
        let filter = Filter {
            exporter: Selection::Only("Acme".into()),
            ..Filter::default()
        };
        let once = filter.apply(&data);
        let twice = filter.apply(once.iter().copied());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unknown_value_yields_empty_view() {
        let data = rows();
        let filter = Filter {
            importer: Selection::Only("Nobody".into()),
            ..Filter::default()
        };
        assert!(filter.apply(&data).is_empty());
    }

    #[test]
    fn test_filter_options_sorted_distinct() {
        let opts = filter_options(&rows());
        assert_eq!(opts.exporters, vec!["Acme", "Borealis"]);
        assert_eq!(opts.importers, vec!["Globex", "Initech"]);
        assert_eq!(opts.statuses, vec!["En Proceso", "Financiada", "Rechazada"]);
    }
}
