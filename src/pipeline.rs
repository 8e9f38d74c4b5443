use chrono::NaiveDate;

use crate::filter::{filter_options, Filter, FilterOptions};
use crate::haircut::haircut_for;
use crate::models::{EnrichedInvoice, InvoiceRecord};
use crate::rates::RateTable;
use crate::risk::bucket_for;

/// Derive the computed columns for one record. Returns `None` when the
/// invoice has no due date or is already past due at `reference_date`.
pub fn enrich_one(
    record: &InvoiceRecord,
    rates: Option<&RateTable>,
    reference_date: NaiveDate,
) -> Option<EnrichedInvoice> {
    let due = record.due_date?;
    let days_to_due = (due - reference_date).num_days();
    if days_to_due < 0 {
        return None;
    }
    let risk = bucket_for(record.risk_score);
    Some(EnrichedInvoice {
        invoice: record.clone(),
        days_to_due,
        risk,
        haircut: haircut_for(&record.product),
        applied_rate: rates.and_then(|t| t.lookup(risk, days_to_due)),
    })
}

/// The enriched base table: every invoice still open at the reference date.
/// Built once per load; views borrow from it.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub rows: Vec<EnrichedInvoice>,
    pub rates: Option<RateTable>,
    pub reference_date: NaiveDate,
    pub past_due: usize,
    pub undated: usize,
}

impl Ledger {
    pub fn build(
        records: &[InvoiceRecord],
        rates: Option<RateTable>,
        reference_date: NaiveDate,
    ) -> Self {
        let mut rows = Vec::with_capacity(records.len());
        let mut past_due = 0usize;
        let mut undated = 0usize;
        for record in records {
            if record.due_date.is_none() {
                undated += 1;
                continue;
            }
            match enrich_one(record, rates.as_ref(), reference_date) {
                Some(row) => rows.push(row),
                None => past_due += 1,
            }
        }
        tracing::debug!(
            kept = rows.len(),
            past_due,
            undated,
            %reference_date,
            "built ledger"
        );
        Self {
            rows,
            rates,
            reference_date,
            past_due,
            undated,
        }
    }

    pub fn has_rates(&self) -> bool {
        self.rates.is_some()
    }

    pub fn view(&self, filter: &Filter) -> Vec<&EnrichedInvoice> {
        filter.apply(&self.rows)
    }

    pub fn filter_options(&self) -> FilterOptions {
        filter_options(&self.rows)
    }
}
