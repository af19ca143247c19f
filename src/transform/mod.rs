//! Column transforms: unit rescale, fixed-lag percent change, ratio to a total.
//!
//! Transforms are implemented as small, pure functions over value slices so that
//! chart recipes can stay declarative (`Derivation`). None of them touches the
//! row set; an undefined result is an absent value, never zero.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::Table;
use crate::error::AppError;

/// Divide every value by `divisor` (e.g. `1e9` for billions).
pub fn rescale(values: &[Option<f64>], divisor: f64) -> Result<Vec<Option<f64>>, AppError> {
    if !(divisor.is_finite() && divisor != 0.0) {
        return Err(AppError::usage(format!("Invalid rescale divisor {divisor}.")));
    }
    Ok(values.iter().map(|v| v.map(|x| x / divisor)).collect())
}

/// `(v[i] - v[i-lag]) / v[i-lag]`, absent for the first `lag` rows.
///
/// The result is a fraction (0.10 for a 10% rise).
pub fn pct_change(values: &[Option<f64>], lag: usize) -> Result<Vec<Option<f64>>, AppError> {
    if lag == 0 {
        return Err(AppError::usage("Percent-change lag must be at least 1."));
    }
    Ok((0..values.len())
        .map(|i| {
            let prev = values.get(i.checked_sub(lag)?).copied().flatten()?;
            let curr = values[i]?;
            if prev == 0.0 {
                return None;
            }
            Some((curr - prev) / prev)
        })
        .collect())
}

/// `(numerator - subtrahend) / denominator * 100`.
///
/// Used both for plain ratios (current account / GDP) and for
/// differences over a total ((exports - imports) / GDP).
pub fn ratio_pct(
    numerator: &[Option<f64>],
    subtrahend: Option<&[Option<f64>]>,
    denominator: &[Option<f64>],
) -> Result<Vec<Option<f64>>, AppError> {
    let n = numerator.len();
    if denominator.len() != n || subtrahend.is_some_and(|s| s.len() != n) {
        return Err(AppError::usage("Ratio operands must have the same length."));
    }
    Ok((0..n)
        .map(|i| {
            let num = numerator[i]?;
            let sub = match subtrahend {
                Some(s) => s[i]?,
                None => 0.0,
            };
            let den = denominator[i]?;
            if den == 0.0 {
                return None;
            }
            Some((num - sub) / den * 100.0)
        })
        .collect())
}

/// Calendar year of a date; used for filtering only.
pub fn year_of(date: NaiveDate) -> i32 {
    date.year()
}

/// A derived column, described as data so chart books can be stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Derivation {
    Rescale {
        source: String,
        divisor: f64,
        output: String,
    },
    PctChange {
        source: String,
        lag: usize,
        output: String,
    },
    RatioPct {
        numerator: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtract: Option<String>,
        denominator: String,
        output: String,
    },
}

impl Derivation {
    pub fn output(&self) -> &str {
        match self {
            Derivation::Rescale { output, .. }
            | Derivation::PctChange { output, .. }
            | Derivation::RatioPct { output, .. } => output,
        }
    }

    /// Compute the derived column and append it to `table`.
    pub fn apply(&self, table: &mut Table) -> Result<(), AppError> {
        let values = match self {
            Derivation::Rescale { source, divisor, .. } => rescale(table.values(source)?, *divisor)?,
            Derivation::PctChange { source, lag, .. } => pct_change(table.values(source)?, *lag)?,
            Derivation::RatioPct {
                numerator,
                subtract,
                denominator,
                ..
            } => {
                let subtrahend = subtract.as_deref().map(|s| table.values(s)).transpose()?;
                ratio_pct(table.values(numerator)?, subtrahend, table.values(denominator)?)?
            }
        };
        table.push_column(self.output(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: Option<f64>) -> bool {
        match (a, b) {
            (Some(x), Some(y)) => (x - y).abs() < 1e-12,
            (None, None) => true,
            _ => false,
        }
    }

    #[test]
    fn pct_change_lag_one_matches_known_values() {
        let out = pct_change(&[Some(100.0), Some(110.0), Some(121.0)], 1).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[0].is_none());
        assert!(approx(out[1], Some(0.10)));
        assert!(approx(out[2], Some(0.10)));
    }

    #[test]
    fn pct_change_is_absent_before_lag_and_exact_after() {
        let values: Vec<Option<f64>> = (1..=30).map(|i| Some(100.0 + (i * i) as f64)).collect();
        let lag = 12;
        let out = pct_change(&values, lag).unwrap();
        assert!(out[..lag].iter().all(|v| v.is_none()));
        for i in lag..values.len() {
            let (curr, prev) = (values[i].unwrap(), values[i - lag].unwrap());
            assert!(approx(out[i], Some((curr - prev) / prev)));
        }
    }

    #[test]
    fn pct_change_skips_gaps_and_zero_base() {
        let out = pct_change(&[Some(0.0), None, Some(5.0), Some(10.0)], 1).unwrap();
        assert_eq!(out, vec![None, None, None, Some(1.0)]);
        assert!(pct_change(&[Some(1.0)], 0).is_err());
    }

    #[test]
    fn rescale_round_trips() {
        let values = vec![Some(1.5e9), None, Some(-2.25e11), Some(0.0)];
        let d = 1e9;
        let back = rescale(&rescale(&values, d).unwrap(), 1.0 / d).unwrap();
        for (a, b) in values.iter().zip(&back) {
            match (a, b) {
                (Some(x), Some(y)) => assert!((x - y).abs() <= 1e-6 * x.abs().max(1.0)),
                (None, None) => {}
                _ => panic!("gap pattern changed"),
            }
        }
        assert!(rescale(&values, 0.0).is_err());
        assert!(rescale(&values, f64::NAN).is_err());
    }

    #[test]
    fn ratio_pct_scales_to_percent() {
        let a = [Some(10.0), Some(20.0), Some(30.0)];
        let b = [Some(100.0), Some(100.0), Some(100.0)];
        let out = ratio_pct(&a, None, &b).unwrap();
        assert!(approx(out[0], Some(10.0)));
        assert!(approx(out[1], Some(20.0)));
        assert!(approx(out[2], Some(30.0)));
    }

    #[test]
    fn ratio_pct_difference_over_total() {
        let exports = [Some(30.0), Some(25.0), None];
        let imports = [Some(20.0), Some(30.0), Some(1.0)];
        let gdp = [Some(200.0), Some(0.0), Some(100.0)];
        let out = ratio_pct(&exports, Some(&imports), &gdp).unwrap();
        assert_eq!(out, vec![Some(5.0), None, None]);
    }

    #[test]
    fn derivation_appends_column_without_touching_rows() {
        let dates = (1..=3).map(|m| NaiveDate::from_ymd_opt(2020, m, 1).unwrap()).collect();
        let mut table = Table::new(dates);
        table.push_column("value", vec![Some(1e9), Some(2e9), None]).unwrap();

        Derivation::Rescale {
            source: "value".into(),
            divisor: 1e9,
            output: "value_bn".into(),
        }
        .apply(&mut table)
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.values("value").unwrap(), &[Some(1e9), Some(2e9), None]);
        assert_eq!(table.values("value_bn").unwrap(), &[Some(1.0), Some(2.0), None]);

        let missing = Derivation::PctChange {
            source: "nope".into(),
            lag: 1,
            output: "x".into(),
        };
        assert!(missing.apply(&mut table).is_err());
    }

    #[test]
    fn derivation_json_is_tagged() {
        let json = r#"{"kind":"ratio-pct","numerator":"Exports","subtract":"Imports","denominator":"GDP","output":"tb"}"#;
        let d: Derivation = serde_json::from_str(json).unwrap();
        assert_eq!(d.output(), "tb");
    }

    #[test]
    fn year_of_extracts_calendar_year() {
        assert_eq!(year_of(NaiveDate::from_ymd_opt(2021, 12, 31).unwrap()), 2021);
    }
}
