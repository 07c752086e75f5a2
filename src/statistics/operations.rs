//! Core statistical operations
//!
//! This module defines the per-band statistics a zone can be reduced with.

use std::str::FromStr;

/// Supported zone statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryStatistic {
    /// Arithmetic mean
    #[default]
    Mean,
    /// Median, averaging the two central values for even counts
    Median,
    /// Population standard deviation
    Std,
    /// Maximum value
    Max,
    /// Mean of the ten largest values
    TopTenMean,
}

impl SummaryStatistic {
    /// Get the string representation of the statistic
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Std => "std",
            Self::Max => "max",
            Self::TopTenMean => "max10",
        }
    }

    /// Reduce `values` to one number
    ///
    /// Non-finite values are skipped; NaN is returned when nothing finite is
    /// left.
    #[must_use]
    pub fn apply(self, values: &[f64]) -> f64 {
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return f64::NAN;
        }

        match self {
            Self::Mean => mean(&finite),
            Self::Std => {
                let centre = mean(&finite);
                (finite.iter().map(|v| (v - centre).powi(2)).sum::<f64>() / finite.len() as f64)
                    .sqrt()
            }
            Self::Max => finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Median => {
                finite.sort_by(f64::total_cmp);
                let mid = finite.len() / 2;
                if finite.len() % 2 == 0 {
                    (finite[mid - 1] + finite[mid]) / 2.0
                } else {
                    finite[mid]
                }
            }
            Self::TopTenMean => {
                finite.sort_by(f64::total_cmp);
                let start = finite.len().saturating_sub(10);
                mean(&finite[start..])
            }
        }
    }
}

impl FromStr for SummaryStatistic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" | "med" => Ok(Self::Median),
            "std" => Ok(Self::Std),
            "max" => Ok(Self::Max),
            "max10" => Ok(Self::TopTenMean),
            other => Err(format!(
                "unknown statistic '{other}', expected mean, median, std, max or max10"
            )),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
