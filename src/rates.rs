use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;

use crate::error::Result;
use crate::importer::parse_amount;
use crate::risk::RiskBucket;
use crate::sheet::{read_sheet, Cell, Sheet};

/// Tenor tiers in days, ascending.
pub const TENOR_TIERS: [u32; 5] = [30, 60, 90, 120, 150];

/// Smallest tier covering `days`. Anything past the last tier is charged at
/// the last tier; there is no extrapolation.
pub fn tier_for(days: i64) -> u32 {
    let last = TENOR_TIERS[TENOR_TIERS.len() - 1];
    TENOR_TIERS
        .iter()
        .copied()
        .find(|tier| days <= i64::from(*tier))
        .unwrap_or(last)
}

pub fn tier_label(tier: u32) -> String {
    format!("{tier} dias")
}

/// Rates per risk bucket and tenor tier, stored as percentages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rows: BTreeMap<RiskBucket, BTreeMap<u32, f64>>,
}

pub struct RatePoint {
    pub bucket: RiskBucket,
    pub tier: u32,
    /// Fraction.
    pub rate: f64,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bucket: RiskBucket, tier: u32, percent: f64) {
        self.rows.entry(bucket).or_default().insert(tier, percent);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn buckets(&self) -> impl Iterator<Item = RiskBucket> + '_ {
        self.rows.keys().copied()
    }

    pub fn percent(&self, bucket: RiskBucket, tier: u32) -> Option<f64> {
        self.rows.get(&bucket)?.get(&tier).copied()
    }

    /// Applicable rate as a fraction. `None` when the bucket (or its tier
    /// column) is not in the table.
    pub fn lookup(&self, bucket: RiskBucket, days: i64) -> Option<f64> {
        if bucket == RiskBucket::Unknown {
            return None;
        }
        self.percent(bucket, tier_for(days)).map(|p| p / 100.0)
    }

    /// Long-form (bucket, tier, rate) points in risk then tenor order.
    pub fn curve(&self) -> Vec<RatePoint> {
        self.rows
            .iter()
            .flat_map(|(bucket, tiers)| {
                tiers.iter().map(move |(tier, pct)| RatePoint {
                    bucket: *bucket,
                    tier: *tier,
                    rate: pct / 100.0,
                })
            })
            .collect()
    }

    /// Mean rate (fraction) across the tiers of each bucket, in risk order.
    pub fn average_by_bucket(&self) -> Vec<(RiskBucket, f64)> {
        self.rows
            .iter()
            .filter(|(_, tiers)| !tiers.is_empty())
            .map(|(bucket, tiers)| {
                let mean = tiers.values().sum::<f64>() / tiers.len() as f64;
                (*bucket, mean / 100.0)
            })
            .collect()
    }

    /// Build from a sheet with a risk-label column and one column per tier
    /// (`30 dias`, `60 días`, `90 days`, or a bare number).
    pub fn from_sheet(sheet: &Sheet) -> Result<Self> {
        let tier_re = Regex::new(r"(?i)^\s*(\d+)\s*(d[ií]as?|days?|d)?\s*$")
            .map_err(|e| crate::error::FactorError::Other(e.to_string()))?;

        let label_col = sheet
            .headers
            .iter()
            .position(|h| {
                let h = h.trim();
                h.eq_ignore_ascii_case("Riesgo") || h.eq_ignore_ascii_case("Risk")
            })
            .unwrap_or(0);

        let mut tier_cols = Vec::new();
        for (i, header) in sheet.headers.iter().enumerate() {
            if i == label_col {
                continue;
            }
            let tier = tier_re
                .captures(header)
                .and_then(|c| c[1].parse::<u32>().ok())
                .filter(|t| TENOR_TIERS.contains(t));
            match tier {
                Some(t) => tier_cols.push((i, t)),
                None if !header.trim().is_empty() => {
                    tracing::warn!(column = %header, "ignoring rate column that is not a tenor tier")
                }
                None => {}
            }
        }

        let mut table = RateTable::new();
        for (r, row) in sheet.rows.iter().enumerate() {
            if row.iter().all(Cell::is_empty) {
                continue;
            }
            let label = sheet.cell(r, label_col).render();
            let Some(bucket) = RiskBucket::from_label(&label).filter(|b| *b != RiskBucket::Unknown)
            else {
                tracing::warn!(label = %label, "skipping rate row with unknown risk label");
                continue;
            };
            for (col, tier) in &tier_cols {
                let percent = match sheet.cell(r, *col) {
                    Cell::Number(n) => Some(*n),
                    Cell::Text(s) => parse_amount(&s.replace('%', "")),
                    _ => None,
                };
                if let Some(p) = percent {
                    table.insert(bucket, *tier, p);
                }
            }
        }
        Ok(table)
    }

    pub fn to_sheet(&self) -> Sheet {
        let mut headers = vec!["Riesgo".to_string()];
        headers.extend(TENOR_TIERS.iter().map(|t| tier_label(*t)));
        let rows = self
            .rows
            .iter()
            .map(|(bucket, tiers)| {
                let mut row = vec![Cell::text(bucket.label())];
                row.extend(TENOR_TIERS.iter().map(|t| Cell::opt_number(tiers.get(t).copied())));
                row
            })
            .collect();
        Sheet { headers, rows }
    }
}

pub fn load_rates(path: &Path) -> Result<RateTable> {
    let sheet = read_sheet(path)?;
    let table = RateTable::from_sheet(&sheet)?;
    if table.is_empty() {
        tracing::warn!(file = %path.display(), "rate table has no usable rows");
    }
    tracing::debug!(file = %path.display(), buckets = table.rows.len(), "loaded rate table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> RateTable {
        let mut t = RateTable::new();
        for (i, tier) in TENOR_TIERS.iter().enumerate() {
            t.insert(RiskBucket::VeryLow, *tier, 1.0 + i as f64 * 0.5);
            t.insert(RiskBucket::VeryHigh, *tier, 5.0 + i as f64);
        }
        t
    }

    #[test]
    fn test_tier_for_boundaries() {
        assert_eq!(tier_for(0), 30);
        assert_eq!(tier_for(30), 30);
        assert_eq!(tier_for(31), 60);
        assert_eq!(tier_for(90), 90);
        assert_eq!(tier_for(121), 150);
        assert_eq!(tier_for(150), 150);
        assert_eq!(tier_for(151), 150);
        assert_eq!(tier_for(10_000), 150);
    }

    #[test]
    fn test_lookup_converts_percent_to_fraction() {
        let t = sample_table();
        assert_eq!(t.lookup(RiskBucket::VeryLow, 20), Some(0.01));
        assert_eq!(t.lookup(RiskBucket::VeryHigh, 200), Some(0.09));
    }

    #[test]
    fn test_lookup_missing_bucket_is_none() {
        let t = sample_table();
        assert_eq!(t.lookup(RiskBucket::Medium, 45), None);
        assert_eq!(t.lookup(RiskBucket::Unknown, 45), None);
    }

    #[test]
    fn test_average_by_bucket_in_risk_order() {
        let avgs = sample_table().average_by_bucket();
        assert_eq!(avgs.len(), 2);
        assert_eq!(avgs[0].0, RiskBucket::VeryLow);
        assert!((avgs[0].1 - 0.02).abs() < 1e-12);
        assert_eq!(avgs[1].0, RiskBucket::VeryHigh);
        assert!((avgs[1].1 - 0.07).abs() < 1e-12);
    }

    #[test]
    fn test_curve_has_point_per_cell() {
        let curve = sample_table().curve();
        assert_eq!(curve.len(), 10);
        assert_eq!(curve[0].tier, 30);
        assert_eq!(curve[9].bucket, RiskBucket::VeryHigh);
    }

    #[test]
    fn test_from_sheet_reads_tier_headers() {
        let sheet = Sheet {
            headers: vec![
                "Riesgo".into(),
                "30 dias".into(),
                "60 días".into(),
                "90 days".into(),
                "120".into(),
                "150 dias".into(),
                "Notas".into(),
            ],
            rows: vec![
                vec![
                    Cell::text("Muy Bajo"),
                    Cell::Number(1.5),
                    Cell::text("2%"),
                    Cell::Number(2.5),
                    Cell::Number(3.0),
                    Cell::Number(3.5),
                    Cell::text("ok"),
                ],
                vec![Cell::text("Extremo"), Cell::Number(99.0)],
            ],
        };
        let t = RateTable::from_sheet(&sheet).unwrap();
        assert_eq!(t.buckets().collect::<Vec<_>>(), vec![RiskBucket::VeryLow]);
        assert_eq!(t.percent(RiskBucket::VeryLow, 60), Some(2.0));
        assert_eq!(t.percent(RiskBucket::VeryLow, 120), Some(3.0));
        assert_eq!(t.lookup(RiskBucket::VeryLow, 400), Some(0.035));
    }

    #[test]
    fn test_sheet_roundtrip() {
        let t = sample_table();
        let back = RateTable::from_sheet(&t.to_sheet()).unwrap();
        assert_eq!(back, t);
    }
}
