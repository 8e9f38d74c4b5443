/// Placeholder for metrics that are undefined on the current view.
pub const NA: &str = "N/A";

fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format a float as whole dollars with thousands separators: $1,235
pub fn money(val: f64) -> String {
    let rounded = format!("{:.0}", val.abs());
    let with_commas = group_thousands(&rounded);
    if val < 0.0 && rounded != "0" {
        format!("-${with_commas}")
    } else {
        format!("${with_commas}")
    }
}

/// Format a fraction as a percentage: pct(0.1234, 1) = "12.3%"
pub fn pct(fraction: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, fraction * 100.0)
}

pub fn opt_pct(fraction: Option<f64>, decimals: usize) -> String {
    fraction.map(|f| pct(f, decimals)).unwrap_or_else(|| NA.to_string())
}

/// Whole-day count, e.g. "45 days".
pub fn days(val: Option<f64>) -> String {
    match val {
        Some(d) if d.is_finite() => format!("{d:.0} days"),
        _ => NA.to_string(),
    }
}

/// Text progress bar for share-of-total columns.
pub fn bar(fraction: f64, width: usize) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
