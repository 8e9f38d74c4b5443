/// Discrete risk category derived from the `Score Riesgo` column.
///
/// Declaration order is risk order, so the derived `Ord` sorts buckets from
/// lowest to highest risk with `Unknown` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskBucket {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
    Unknown,
}

impl RiskBucket {
    /// Buckets a rate table can carry a row for.
    pub const RATED: [RiskBucket; 5] = [
        RiskBucket::VeryLow,
        RiskBucket::Low,
        RiskBucket::Medium,
        RiskBucket::High,
        RiskBucket::VeryHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryLow => "Muy Bajo",
            Self::Low => "Bajo",
            Self::Medium => "Medio",
            Self::High => "Alto",
            Self::VeryHigh => "Muy Alto",
            Self::Unknown => "Desconocido",
        }
    }

    /// Parses a rate-sheet or export label. English names are accepted too.
    pub fn from_label(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();
        match key.as_str() {
            "muybajo" | "verylow" => Some(Self::VeryLow),
            "bajo" | "low" => Some(Self::Low),
            "medio" | "medium" => Some(Self::Medium),
            "alto" | "high" => Some(Self::High),
            "muyalto" | "veryhigh" => Some(Self::VeryHigh),
            "desconocido" | "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// Lower bounds, checked in order. A score below the last bound is `VeryHigh`.
const RISK_THRESHOLDS: &[(f64, RiskBucket)] = &[
    (9.0, RiskBucket::VeryLow),
    (7.0, RiskBucket::Low),
    (5.0, RiskBucket::Medium),
    (3.0, RiskBucket::High),
];

/// Missing or NaN scores map to `Unknown` rather than falling through to the
/// riskiest bucket.
pub fn bucket_for(score: Option<f64>) -> RiskBucket {
    match score {
        Some(s) if !s.is_nan() => RISK_THRESHOLDS
            .iter()
            .find(|(bound, _)| s >= *bound)
            .map(|(_, bucket)| *bucket)
            .unwrap_or(RiskBucket::VeryHigh),
        _ => RiskBucket::Unknown,
    }
}
