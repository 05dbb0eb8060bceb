use serde::Serialize;

/// Letter grade for how many months of ceiling-sized repayments a cumulative
/// total represents. Variants are ordered from soonest to latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MaturityBand {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "E+")]
    EPlus,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "F")]
    F,
}

/// Upper bound (inclusive) in months for each band; anything above the last
/// threshold is `F`.
const BAND_THRESHOLDS: [(i64, MaturityBand); 10] = [
    (7, MaturityBand::APlus),
    (13, MaturityBand::A),
    (19, MaturityBand::BPlus),
    (25, MaturityBand::B),
    (31, MaturityBand::CPlus),
    (37, MaturityBand::C),
    (43, MaturityBand::DPlus),
    (49, MaturityBand::D),
    (55, MaturityBand::EPlus),
    (60, MaturityBand::E),
];

impl MaturityBand {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::DPlus => "D+",
            Self::D => "D",
            Self::EPlus => "E+",
            Self::E => "E",
            Self::F => "F",
        }
    }

    pub fn for_months(months: i64) -> Self {
        BAND_THRESHOLDS
            .iter()
            .find(|(limit, _)| months <= *limit)
            .map(|(_, band)| *band)
            .unwrap_or(Self::F)
    }
}

/// Months of ceiling-sized repayments needed to cover `cumulative`, rounded up.
/// A negative cumulative (from negative stored values) yields zero or
/// negative months, which band as `A+`.
pub fn months(cumulative: Option<f64>, ceiling: Option<f64>) -> Option<i64> {
    let (cumulative, ceiling) = (cumulative?, ceiling?);
    if ceiling == 0.0 || !ceiling.is_finite() || !cumulative.is_finite() {
        return None;
    }

    let required = (cumulative / ceiling).ceil();
    if !required.is_finite() || required.abs() > i64::MAX as f64 {
        return None;
    }
    Some(required as i64)
}

pub fn band(months: Option<i64>) -> Option<MaturityBand> {
    months.map(MaturityBand::for_months)
}
