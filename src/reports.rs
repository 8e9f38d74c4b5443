use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};

use crate::models::{EnrichedInvoice, PaymentStatus, Status};
use crate::risk::RiskBucket;

/// Number of exporters counted in the concentration KPI.
pub const TOP_EXPORTERS: usize = 5;

/// `num / den`, or 0 when the denominator is not positive.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Summary KPIs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

impl Stats {
    /// `None` for an empty input.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;
        for v in values {
            count += 1;
            sum += v;
            max = max.max(v);
            min = min.min(v);
        }
        (count > 0).then(|| Stats {
            mean: sum / count as f64,
            max,
            min,
        })
    }
}

/// Financed amount by repayment state, as fractions of the approved total.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentBreakdown {
    pub current: f64,
    pub paid: f64,
    pub late: f64,
    pub delinquent: f64,
    pub unpaid: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub total_value: f64,
    pub financeable_value: f64,
    pub approved: f64,
    pub rejected: f64,
    pub in_process: f64,
    pub pct_financed: f64,
    pub pct_in_process: f64,
    pub payments: PaymentBreakdown,
    pub rate: Option<Stats>,
    pub tenor: Option<Stats>,
    pub top_exporter_share: f64,
    pub haircut_adjusted_value: f64,
}

fn sum_where<F>(rows: &[&EnrichedInvoice], pred: F, value: fn(&EnrichedInvoice) -> f64) -> f64
where
    F: Fn(&EnrichedInvoice) -> bool,
{
    rows.iter().filter(|r| pred(**r)).map(|r| value(*r)).sum()
}

fn invoice_value(r: &EnrichedInvoice) -> f64 {
    r.invoice.invoice_value
}

fn financed_amount(r: &EnrichedInvoice) -> f64 {
    r.financed_amount()
}

pub fn get_summary(rows: &[&EnrichedInvoice]) -> Summary {
    let total_value = sum_where(rows, |_| true, invoice_value);
    let financeable_value = sum_where(rows, |r| r.invoice.status.is_financeable(), invoice_value);
    let approved = sum_where(rows, EnrichedInvoice::is_financed, financed_amount);
    let rejected = sum_where(rows, |r| r.invoice.status == Status::Rejected, invoice_value);
    let in_process = sum_where(rows, |r| r.invoice.status == Status::InProcess, invoice_value);

    let financed: Vec<&EnrichedInvoice> = rows.iter().copied().filter(|r| r.is_financed()).collect();

    let mut by_payment = PaymentBreakdown::default();
    for r in &financed {
        let slot = match &r.invoice.payment_status {
            Some(PaymentStatus::Current) => &mut by_payment.current,
            Some(PaymentStatus::Paid) => &mut by_payment.paid,
            Some(PaymentStatus::Late) => &mut by_payment.late,
            Some(PaymentStatus::Delinquent) => &mut by_payment.delinquent,
            Some(PaymentStatus::Unpaid) => &mut by_payment.unpaid,
            _ => continue,
        };
        *slot += r.financed_amount();
    }
    let payments = PaymentBreakdown {
        current: ratio(by_payment.current, approved),
        paid: ratio(by_payment.paid, approved),
        late: ratio(by_payment.late, approved),
        delinquent: ratio(by_payment.delinquent, approved),
        unpaid: ratio(by_payment.unpaid, approved),
    };

    let top: f64 = get_top_exporters(rows, TOP_EXPORTERS).iter().map(|g| g.total).sum();
    let haircut_adjusted_value: f64 = rows
        .iter()
        .filter(|r| r.invoice.status.is_financeable())
        .map(|r| r.invoice.invoice_value * (1.0 - r.haircut))
        .sum();

    Summary {
        count: rows.len(),
        total_value,
        financeable_value,
        approved,
        rejected,
        in_process,
        pct_financed: ratio(approved, total_value),
        pct_in_process: ratio(in_process, approved),
        payments,
        rate: Stats::of(financed.iter().filter_map(|r| r.applied_rate)),
        tenor: Stats::of(financed.iter().map(|r| r.days_to_due as f64)),
        top_exporter_share: ratio(top, total_value),
        haircut_adjusted_value,
    }
}

// ---------------------------------------------------------------------------
// Grouped totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotal {
    pub name: String,
    pub total: f64,
}

/// Sum `value` per key, sorted by total descending then name.
fn group_totals<'a>(
    rows: impl Iterator<Item = &'a EnrichedInvoice>,
    key: fn(&EnrichedInvoice) -> &str,
    value: fn(&EnrichedInvoice) -> f64,
) -> Vec<GroupTotal> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for r in rows {
        *totals.entry(key(r).to_string()).or_default() += value(r);
    }
    let mut groups: Vec<GroupTotal> = totals
        .into_iter()
        .map(|(name, total)| GroupTotal { name, total })
        .collect();
    groups.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    groups
}

/// Invoice value of financed invoices per product.
pub fn get_product_totals(rows: &[&EnrichedInvoice]) -> Vec<GroupTotal> {
    group_totals(
        rows.iter().copied().filter(|r| r.is_financed()),
        |r| r.invoice.product.as_str(),
        invoice_value,
    )
}

/// Invoice value of financed invoices per destination country.
pub fn get_destination_totals(rows: &[&EnrichedInvoice]) -> Vec<GroupTotal> {
    group_totals(
        rows.iter().copied().filter(|r| r.is_financed()),
        |r| r.invoice.destination.as_str(),
        invoice_value,
    )
}

pub fn get_top_exporters(rows: &[&EnrichedInvoice], n: usize) -> Vec<GroupTotal> {
    let mut groups = group_totals(rows.iter().copied(), |r| r.invoice.exporter.as_str(), invoice_value);
    groups.truncate(n);
    groups
}

// ---------------------------------------------------------------------------
// Risk breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RiskGroup {
    pub bucket: RiskBucket,
    pub total: f64,
    pub count: usize,
    pub share: f64,
}

pub fn get_risk_breakdown(rows: &[&EnrichedInvoice]) -> Vec<RiskGroup> {
    let mut acc: BTreeMap<RiskBucket, (f64, usize)> = BTreeMap::new();
    for r in rows {
        let entry = acc.entry(r.risk).or_default();
        entry.0 += r.invoice.invoice_value;
        entry.1 += 1;
    }
    let grand_total: f64 = acc.values().map(|(t, _)| t).sum();
    let mut groups: Vec<RiskGroup> = acc
        .into_iter()
        .map(|(bucket, (total, count))| RiskGroup {
            bucket,
            total,
            count,
            share: ratio(total, grand_total),
        })
        .collect();
    // Stable sort keeps risk order among equal totals.
    groups.sort_by(|a, b| b.total.total_cmp(&a.total));
    groups
}

// ---------------------------------------------------------------------------
// Due-date flow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Granularity {
    Monthly,
    Weekly,
    Daily,
}

impl Granularity {
    /// First day of the bucket containing `date`. Weeks start on Monday.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Monthly => date.with_day(1).unwrap_or(date),
            Self::Weekly => {
                date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Self::Daily => date,
        }
    }

    pub fn label(&self, start: NaiveDate) -> String {
        match self {
            Self::Monthly => start.format("%Y-%m").to_string(),
            Self::Weekly => start.format("%b %d").to_string(),
            Self::Daily => start.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Weekly => "Weekly",
            Self::Daily => "Daily",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowBucket {
    pub start: NaiveDate,
    pub label: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DueFlow {
    pub granularity: Granularity,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub buckets: Vec<FlowBucket>,
    pub total: f64,
}

/// Financed amount of financed invoices by due-date bucket. The range is
/// inclusive and defaults to the earliest/latest financed due date.
pub fn get_due_flow(
    rows: &[&EnrichedInvoice],
    granularity: Granularity,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> DueFlow {
    let financed: Vec<(&EnrichedInvoice, NaiveDate)> = rows
        .iter()
        .copied()
        .filter(|r| r.is_financed())
        .filter_map(|r| r.invoice.due_date.map(|d| (r, d)))
        .collect();
    let from = from.or_else(|| financed.iter().map(|(_, d)| *d).min());
    let to = to.or_else(|| financed.iter().map(|(_, d)| *d).max());

    let mut acc: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (r, due) in &financed {
        if from.is_some_and(|f| *due < f) || to.is_some_and(|t| *due > t) {
            continue;
        }
        *acc.entry(granularity.bucket_start(*due)).or_default() += r.financed_amount();
    }
    let buckets: Vec<FlowBucket> = acc
        .into_iter()
        .map(|(start, total)| FlowBucket {
            start,
            label: granularity.label(start),
            total,
        })
        .collect();
    let total: f64 = buckets.iter().map(|b| b.total).sum();
    DueFlow {
        granularity,
        from,
        to,
        buckets,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceRecord;
    use crate::risk::bucket_for;

    struct Row {
        exporter: &'static str,
        product: &'static str,
        destination: &'static str,
        status: Status,
        payment: Option<PaymentStatus>,
        value: f64,
        financed: Option<f64>,
        score: f64,
        due: (i32, u32, u32),
        rate: Option<f64>,
    }

    fn make(r: Row) -> EnrichedInvoice {
        let due = NaiveDate::from_ymd_opt(r.due.0, r.due.1, r.due.2).unwrap();
        EnrichedInvoice {
            invoice: InvoiceRecord {
                exporter: r.exporter.into(),
                importer: "Globex".into(),
                product: r.product.into(),
                destination: r.destination.into(),
                issue_date: None,
                due_date: Some(due),
                invoice_value: r.value,
                financed_amount: r.financed,
                risk_score: Some(r.score),
                status: r.status,
                payment_status: r.payment,
            },
            days_to_due: (due - NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()).num_days(),
            risk: bucket_for(Some(r.score)),
            haircut: crate::haircut::haircut_for(r.product),
            applied_rate: r.rate,
        }
    }

    fn sample() -> Vec<EnrichedInvoice> {
        vec![
            make(Row {
                exporter: "Acme", product: "Fruta", destination: "Chile",
                status: Status::Financed, payment: Some(PaymentStatus::Paid),
                value: 1000.0, financed: Some(800.0), score: 9.5, due: (2025, 6, 11), rate: Some(0.02),
            }),
            make(Row {
                exporter: "Acme", product: "Vino", destination: "Peru",
                status: Status::Financed, payment: Some(PaymentStatus::Late),
                value: 500.0, financed: Some(200.0), score: 6.0, due: (2025, 7, 1), rate: Some(0.04),
            }),
            make(Row {
                exporter: "Borealis", product: "Fruta", destination: "Chile",
                status: Status::Rejected, payment: None,
                value: 400.0, financed: None, score: 2.0, due: (2025, 6, 20), rate: None,
            }),
            make(Row {
                exporter: "Cygnus", product: "Cobre", destination: "Peru",
                status: Status::InProcess, payment: None,
                value: 100.0, financed: None, score: 7.5, due: (2025, 6, 13), rate: Some(0.03),
            }),
            make(Row {
                exporter: "Dyad", product: "Otro", destination: "Brasil",
                status: Status::NotFinanceable, payment: None,
                value: 250.0, financed: None, score: 4.0, due: (2025, 8, 5), rate: None,
            }),
        ]
    }

    fn refs(rows: &[EnrichedInvoice]) -> Vec<&EnrichedInvoice> {
        rows.iter().collect()
    }

    #[test]
    fn test_ratio_guards_zero_denominator() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert_eq!(ratio(1.0, 4.0), 0.25);
    }

    #[test]
    fn test_summary_totals() {
        let data = sample();
        let s = get_summary(&refs(&data));
        assert_eq!(s.count, 5);
        assert_eq!(s.total_value, 2250.0);
        assert_eq!(s.financeable_value, 2000.0);
        assert_eq!(s.approved, 1000.0);
        assert_eq!(s.rejected, 400.0);
        assert_eq!(s.in_process, 100.0);
        assert!((s.pct_financed - 1000.0 / 2250.0).abs() < 1e-12);
        assert!((s.pct_in_process - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_summary_payment_breakdown_over_approved() {
        let data = sample();
        let s = get_summary(&refs(&data));
        assert!((s.payments.paid - 0.8).abs() < 1e-12);
        assert!((s.payments.late - 0.2).abs() < 1e-12);
        assert_eq!(s.payments.current, 0.0);
        assert_eq!(s.payments.delinquent, 0.0);
    }

    #[test]
    fn test_summary_rate_and_tenor_use_financed_rows_only() {
        let data = sample();
        let s = get_summary(&refs(&data));
        let rate = s.rate.unwrap();
        assert!((rate.mean - 0.03).abs() < 1e-12);
        assert_eq!(rate.max, 0.04);
        assert_eq!(rate.min, 0.02);
        let tenor = s.tenor.unwrap();
        assert_eq!(tenor.min, 10.0);
        assert_eq!(tenor.max, 30.0);
        assert_eq!(tenor.mean, 20.0);
    }

    #[test]
    fn test_summary_haircut_adjusted_value() {
        let data = sample();
        let s = get_summary(&refs(&data));
        // 1000*0.85 + 500*0.80 + 400*0.85 + 100*0.75
        assert!((s.haircut_adjusted_value - 1665.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_of_empty_view_is_zero_and_undefined() {
        let s = get_summary(&[]);
        assert_eq!(s.total_value, 0.0);
        assert_eq!(s.pct_financed, 0.0);
        assert_eq!(s.pct_in_process, 0.0);
        assert_eq!(s.top_exporter_share, 0.0);
        assert_eq!(s.payments, PaymentBreakdown::default());
        assert!(s.rate.is_none());
        assert!(s.tenor.is_none());
    }

    #[test]
    fn test_top_exporter_concentration() {
        let data = sample();
        let s = get_summary(&refs(&data));
        // Four exporters, all within the top five
        assert_eq!(s.top_exporter_share, 1.0);
        let top = get_top_exporters(&refs(&data), 2);
        assert_eq!(top[0], GroupTotal { name: "Acme".into(), total: 1500.0 });
        assert_eq!(top[1].name, "Borealis");
    }

    #[test]
    fn test_product_and_destination_totals_financed_only() {
        let data = sample();
        let products = get_product_totals(&refs(&data));
        assert_eq!(
            products,
            vec![
                GroupTotal { name: "Fruta".into(), total: 1000.0 },
                GroupTotal { name: "Vino".into(), total: 500.0 },
            ]
        );
        let destinations = get_destination_totals(&refs(&data));
        assert_eq!(destinations.len(), 2);
        assert_eq!(destinations[0].name, "Chile");
    }

    #[test]
    fn test_risk_breakdown_sorted_by_total() {
        let data = sample();
        let groups = get_risk_breakdown(&refs(&data));
        assert_eq!(groups[0].bucket, RiskBucket::VeryLow);
        assert_eq!(groups[0].count, 1);
        let shares: f64 = groups.iter().map(|g| g.share).sum();
        assert!((shares - 1.0).abs() < 1e-12);
        assert!(groups.windows(2).all(|w| w[0].total >= w[1].total));
    }

    #[test]
    fn test_due_flow_monthly() {
        let data = sample();
        let flow = get_due_flow(&refs(&data), Granularity::Monthly, None, None);
        let labels: Vec<&str> = flow.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2025-06", "2025-07"]);
        assert_eq!(flow.buckets[0].total, 800.0);
        assert_eq!(flow.total, 1000.0);
        assert_eq!(flow.from, NaiveDate::from_ymd_opt(2025, 6, 11));
        assert_eq!(flow.to, NaiveDate::from_ymd_opt(2025, 7, 1));
    }

    #[test]
    fn test_due_flow_weekly_starts_monday() {
        let data = sample();
        let flow = get_due_flow(&refs(&data), Granularity::Weekly, None, None);
        // 2025-06-11 is a Wednesday, 2025-07-01 a Tuesday
        assert_eq!(flow.buckets[0].start, NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());
        assert_eq!(flow.buckets[0].label, "Jun 09");
        assert_eq!(flow.buckets[1].start, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
    }

    #[test]
    fn test_due_flow_range_is_inclusive() {
        let data = sample();
        let day = NaiveDate::from_ymd_opt(2025, 7, 1);
        let flow = get_due_flow(&refs(&data), Granularity::Daily, day, day);
        assert_eq!(flow.buckets.len(), 1);
        assert_eq!(flow.buckets[0].label, "2025-07-01");
        assert_eq!(flow.total, 200.0);
    }
}
