use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{filter_from, load_ledger, parse_opt_date, DataArgs};
use crate::error::Result;
use crate::filter::{Filter, FilterOptions};
use crate::fmt::{bar, days, money, opt_pct, pct, NA};
use crate::models::EnrichedInvoice;
use crate::pipeline::Ledger;
use crate::rates::{tier_label, RateTable, TENOR_TIERS};
use crate::reports::{self, DueFlow, GroupTotal, Granularity, RiskGroup, Summary};
use crate::sheet::DATE_FORMAT;

const BAR_WIDTH: usize = 20;

fn right(text: impl std::fmt::Display) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// One-line description of what the numbers below are computed over.
pub fn format_context(ledger: &Ledger, filter: &Filter, shown: usize) -> String {
    let mut line = format!(
        "As of {} | {} of {} open invoices",
        ledger.reference_date.format("%Y-%m-%d"),
        shown,
        ledger.rows.len()
    );
    if !filter.is_empty() {
        line.push_str(&format!(
            " | exporter: {}, importer: {}, status: {}",
            filter.exporter, filter.importer, filter.status
        ));
    }
    if ledger.past_due > 0 {
        line.push_str(&format!(" | {} past due excluded", ledger.past_due));
    }
    line
}

/// KPI table. The RATES section is left out when no rate table is loaded.
pub fn format_summary(summary: &Summary, with_rates: bool) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);

    let rows: Vec<(&str, String)> = vec![
        ("Invoices", summary.count.to_string()),
        ("Total invoice value", money(summary.total_value)),
        ("Financeable value", money(summary.financeable_value)),
        ("Approved (financed)", money(summary.approved)),
        ("Rejected", money(summary.rejected)),
        ("In process", money(summary.in_process)),
        ("% financed", pct(summary.pct_financed, 1)),
        ("In process / approved", pct(summary.pct_in_process, 1)),
        ("Haircut-adjusted value", money(summary.haircut_adjusted_value)),
        ("Top exporters share", pct(summary.top_exporter_share, 1)),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), right(value)]);
    }

    table.add_row(vec![Cell::new("PAYMENTS".cyan().bold()), Cell::new("")]);
    let p = &summary.payments;
    for (label, share) in [
        ("Current", p.current),
        ("Paid", p.paid),
        ("Late", p.late),
        ("Delinquent", p.delinquent),
        ("Unpaid", p.unpaid),
    ] {
        table.add_row(vec![Cell::new(format!("  {label}")), right(pct(share, 1))]);
    }

    if with_rates {
        table.add_row(vec![Cell::new("RATES".cyan().bold()), Cell::new("")]);
        let rate = summary.rate;
        table.add_row(vec![Cell::new("  Average"), right(opt_pct(rate.map(|s| s.mean), 2))]);
        table.add_row(vec![Cell::new("  Max"), right(opt_pct(rate.map(|s| s.max), 2))]);
        table.add_row(vec![Cell::new("  Min"), right(opt_pct(rate.map(|s| s.min), 2))]);
    }

    table.add_row(vec![Cell::new("TENOR".cyan().bold()), Cell::new("")]);
    let tenor = summary.tenor;
    table.add_row(vec![Cell::new("  Average"), right(days(tenor.map(|s| s.mean)))]);
    table.add_row(vec![Cell::new("  Max"), right(days(tenor.map(|s| s.max)))]);
    table.add_row(vec![Cell::new("  Min"), right(days(tenor.map(|s| s.min)))]);

    table.to_string()
}

pub fn format_risk(groups: &[RiskGroup]) -> String {
    if groups.is_empty() {
        return "No invoices match the current filters.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["Risk", "Invoices", "Value", "Share", ""]);
    for g in groups {
        table.add_row(vec![
            Cell::new(g.bucket.label()),
            right(g.count),
            right(money(g.total)),
            right(pct(g.share, 1)),
            Cell::new(bar(g.share, BAR_WIDTH)),
        ]);
    }
    table.to_string()
}

pub fn format_rates(rates: Option<&RateTable>) -> String {
    let Some(rates) = rates.filter(|t| !t.is_empty()) else {
        return "No rate table loaded. Pass --rates <FILE> or run `factor demo`.".to_string();
    };

    let mut matrix = Table::new();
    let mut header = vec![Cell::new("Risk")];
    header.extend(TENOR_TIERS.iter().map(|t| Cell::new(tier_label(*t))));
    matrix.set_header(header);
    let curve = rates.curve();
    for bucket in rates.buckets() {
        let mut row = vec![Cell::new(bucket.label())];
        for tier in TENOR_TIERS {
            let cell = curve
                .iter()
                .find(|p| p.bucket == bucket && p.tier == tier)
                .map(|p| pct(p.rate, 2))
                .unwrap_or_else(|| NA.to_string());
            row.push(right(cell));
        }
        matrix.add_row(row);
    }

    let mut averages = Table::new();
    averages.set_header(vec!["Risk", "Average rate"]);
    for (bucket, mean) in rates.average_by_bucket() {
        averages.add_row(vec![Cell::new(bucket.label()), right(pct(mean, 2))]);
    }

    format!("{matrix}\n\n{averages}")
}

pub fn format_groups(title: &str, groups: &[GroupTotal]) -> String {
    if groups.is_empty() {
        return "No financed invoices match the current filters.".to_string();
    }
    let grand: f64 = groups.iter().map(|g| g.total).sum();
    let mut table = Table::new();
    table.set_header(vec![title, "Financed value", "Share"]);
    for g in groups {
        table.add_row(vec![
            Cell::new(&g.name),
            right(money(g.total)),
            right(pct(reports::ratio(g.total, grand), 1)),
        ]);
    }
    table.add_row(vec![Cell::new("Total".bold()), right(money(grand)), Cell::new("")]);
    table.to_string()
}

pub fn format_flow(flow: &DueFlow) -> String {
    if flow.buckets.is_empty() {
        return "No financed invoices fall due in this range.".to_string();
    }
    let peak = flow.buckets.iter().map(|b| b.total).fold(0.0, f64::max);
    let mut table = Table::new();
    table.set_header(vec![flow.granularity.name(), "Financed", ""]);
    for b in &flow.buckets {
        table.add_row(vec![
            Cell::new(&b.label),
            right(money(b.total)),
            Cell::new(bar(reports::ratio(b.total, peak), BAR_WIDTH)),
        ]);
    }
    table.add_row(vec![Cell::new("Total".bold()), right(money(flow.total)), Cell::new("")]);

    let range = match (flow.from, flow.to) {
        (Some(f), Some(t)) => format!("Due {} to {}", f.format("%Y-%m-%d"), t.format("%Y-%m-%d")),
        _ => String::new(),
    };
    format!("{range}\n{table}")
}

pub fn format_detail(rows: &[&EnrichedInvoice], limit: Option<usize>, with_rates: bool) -> String {
    if rows.is_empty() {
        return "No invoices match the current filters.".to_string();
    }
    let shown = limit.unwrap_or(rows.len()).min(rows.len());
    let mut table = Table::new();
    let mut header = vec![
        "Exporter", "Importer", "Product", "Due", "Days", "Risk", "Value", "Financed", "Status",
        "Haircut",
    ];
    if with_rates {
        header.push("Rate");
    }
    table.set_header(header);
    for r in &rows[..shown] {
        let inv = &r.invoice;
        let mut row = vec![
            Cell::new(&inv.exporter),
            Cell::new(&inv.importer),
            Cell::new(&inv.product),
            Cell::new(inv.due_date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()),
            right(r.days_to_due),
            Cell::new(r.risk.label()),
            right(money(inv.invoice_value)),
            right(inv.financed_amount.map(money).unwrap_or_default()),
            Cell::new(inv.status.label()),
            right(pct(r.haircut, 0)),
        ];
        if with_rates {
            row.push(right(opt_pct(r.applied_rate, 2)));
        }
        table.add_row(row);
    }
    let mut out = table.to_string();
    if shown < rows.len() {
        out.push_str(&format!("\n... {} more (use --limit)", rows.len() - shown));
    }
    out
}

pub fn format_filters(options: &FilterOptions) -> String {
    let mut out = String::new();
    for (title, flag, values) in [
        ("Exporters", "--exporter", &options.exporters),
        ("Importers", "--importer", &options.importers),
        ("Statuses", "--status", &options.statuses),
    ] {
        out.push_str(&format!("{} ({flag})\n", title.bold()));
        if values.is_empty() {
            out.push_str("  (none)\n");
        }
        for v in values {
            out.push_str(&format!("  {v}\n"));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn print_with_context(ledger: &Ledger, filter: &Filter, shown: usize, body: String) {
    println!("{}", format_context(ledger, filter, shown).dimmed());
    println!("{body}");
}

pub fn summary(args: &DataArgs) -> Result<()> {
    let ledger = load_ledger(args)?;
    let filter = filter_from(args);
    let view = ledger.view(&filter);
    let body = format_summary(&reports::get_summary(&view), ledger.has_rates());
    print_with_context(&ledger, &filter, view.len(), body);
    Ok(())
}

pub fn risk(args: &DataArgs) -> Result<()> {
    let ledger = load_ledger(args)?;
    let filter = filter_from(args);
    let view = ledger.view(&filter);
    print_with_context(&ledger, &filter, view.len(), format_risk(&reports::get_risk_breakdown(&view)));
    Ok(())
}

pub fn rates(args: &DataArgs) -> Result<()> {
    let ledger = load_ledger(args)?;
    println!("{}", format_rates(ledger.rates.as_ref()));
    Ok(())
}

pub fn products(args: &DataArgs) -> Result<()> {
    let ledger = load_ledger(args)?;
    let filter = filter_from(args);
    let view = ledger.view(&filter);
    let body = format_groups("Product", &reports::get_product_totals(&view));
    print_with_context(&ledger, &filter, view.len(), body);
    Ok(())
}

pub fn destinations(args: &DataArgs) -> Result<()> {
    let ledger = load_ledger(args)?;
    let filter = filter_from(args);
    let view = ledger.view(&filter);
    let body = format_groups("Destination", &reports::get_destination_totals(&view));
    print_with_context(&ledger, &filter, view.len(), body);
    Ok(())
}

pub fn flow(
    args: &DataArgs,
    period: Granularity,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let from = parse_opt_date(from.as_deref())?;
    let to = parse_opt_date(to.as_deref())?;
    let ledger = load_ledger(args)?;
    let filter = filter_from(args);
    let view = ledger.view(&filter);
    let body = format_flow(&reports::get_due_flow(&view, period, from, to));
    print_with_context(&ledger, &filter, view.len(), body);
    Ok(())
}

pub fn detail(args: &DataArgs, limit: Option<usize>) -> Result<()> {
    let ledger = load_ledger(args)?;
    let filter = filter_from(args);
    let view = ledger.view(&filter);
    let body = format_detail(&view, limit, ledger.has_rates());
    print_with_context(&ledger, &filter, view.len(), body);
    Ok(())
}

pub fn filters(args: &DataArgs) -> Result<()> {
    let ledger = load_ledger(args)?;
    print!("{}", format_filters(&ledger.filter_options()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Selection;
    use crate::models::{InvoiceRecord, PaymentStatus, Status};
    use crate::risk::RiskBucket;
    use chrono::NaiveDate;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn ledger() -> Ledger {
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day);
        let rec = |exporter: &str, product: &str, status, value, financed, score, due| InvoiceRecord {
            exporter: exporter.to_string(),
            importer: "Globex".to_string(),
            product: product.to_string(),
            destination: "Chile".to_string(),
            issue_date: d(5, 1),
            due_date: due,
            invoice_value: value,
            financed_amount: financed,
            risk_score: score,
            status,
            payment_status: Some(PaymentStatus::Current),
        };
        let records = vec![
            rec("Acme", "Fruta", Status::Financed, 1000.0, Some(800.0), Some(9.5), d(6, 20)),
            rec("Borealis", "Vino", Status::Rejected, 500.0, None, Some(6.0), d(6, 11)),
            rec("Acme", "Cobre", Status::Financed, 2000.0, Some(1500.0), Some(2.0), d(12, 18)),
            rec("Acme", "Vino", Status::Financed, 9999.0, Some(1.0), Some(5.0), d(5, 1)),
        ];
        let mut rates = RateTable::new();
        rates.insert(RiskBucket::VeryLow, 30, 1.5);
        rates.insert(RiskBucket::VeryHigh, 150, 6.0);
        Ledger::build(&records, Some(rates), reference())
    }

    #[test]
    fn test_summary_table_values() {
        let ledger = ledger();
        let view = ledger.view(&Filter::default());
        let out = format_summary(&reports::get_summary(&view), true);
        assert!(out.contains("$3,500"));
        assert!(out.contains("$2,300"));
        assert!(out.contains("65.7%"));
    }

    #[test]
    fn test_summary_of_empty_view_shows_zeros_and_na() {
        let out = format_summary(&reports::get_summary(&[]), true);
        assert!(out.contains("$0"));
        assert!(out.contains("0.0%"));
        assert!(out.contains("N/A"));
    }

    #[test]
    fn test_context_mentions_filters_and_past_due() {
        let ledger = ledger();
        let filter = Filter {
            exporter: Selection::Only("Acme".into()),
            ..Filter::default()
        };
        let line = format_context(&ledger, &filter, 2);
        assert!(line.contains("2025-06-01"));
        assert!(line.contains("2 of 3"));
        assert!(line.contains("exporter: Acme"));
        assert!(line.contains("1 past due"));
    }

    #[test]
    fn test_risk_report_orders_by_value() {
        let ledger = ledger();
        let view = ledger.view(&Filter::default());
        let out = format_risk(&reports::get_risk_breakdown(&view));
        let high = out.find("Muy Alto").unwrap();
        let low = out.find("Muy Bajo").unwrap();
        assert!(high < low);
    }

    #[test]
    fn test_rates_matrix_marks_missing_cells() {
        let ledger = ledger();
        let out = format_rates(ledger.rates.as_ref());
        assert!(out.contains("30 dias"));
        assert!(out.contains("1.50%"));
        assert!(out.contains("N/A"));
    }

    #[test]
    fn test_rates_without_table_prints_notice() {
        assert!(format_rates(None).contains("No rate table loaded"));
    }

    #[test]
    fn test_groups_report() {
        let ledger = ledger();
        let view = ledger.view(&Filter::default());
        let out = format_groups("Product", &reports::get_product_totals(&view));
        assert!(out.contains("Cobre"));
        assert!(out.contains("$3,000"));
        assert!(!out.contains("Vino"));
    }

    #[test]
    fn test_flow_report() {
        let ledger = ledger();
        let view = ledger.view(&Filter::default());
        let out = format_flow(&reports::get_due_flow(&view, Granularity::Monthly, None, None));
        assert!(out.contains("2025-06"));
        assert!(out.contains("2025-12"));
        assert!(out.contains("$2,300"));
        assert!(out.starts_with("Due 2025-06-20 to 2025-12-18"));
    }

    #[test]
    fn test_detail_respects_limit() {
        let ledger = ledger();
        let view = ledger.view(&Filter::default());
        let out = format_detail(&view, Some(1), true);
        assert!(out.contains("Acme"));
        assert!(out.contains("20/06/2025"));
        assert!(out.contains("2 more"));
    }

    #[test]
    fn test_rate_sections_omitted_without_rate_table() {
        let ledger = ledger();
        let view = ledger.view(&Filter::default());
        let summary = format_summary(&reports::get_summary(&view), false);
        assert!(!summary.contains("RATES"));
        assert!(summary.contains("TENOR"));
        let detail = format_detail(&view, None, false);
        assert!(!detail.contains("Rate"));
        assert!(!detail.contains("1.50%"));
        assert!(format_detail(&view, None, true).contains("1.50%"));
    }

    #[test]
    fn test_filters_listing() {
        let out = format_filters(&ledger().filter_options());
        assert!(out.contains("Acme"));
        assert!(out.contains("Borealis"));
        assert!(out.contains("Rechazada"));
    }
}
