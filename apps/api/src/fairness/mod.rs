//! Pay-equity and fairness analysis.
//!
//! Everything under this module is pure, synchronous computation over
//! caller-supplied arrays: ingest → aggregate → compare → score → recommend.
//! Nothing is cached between calls. The HTTP layer in `handlers` and the
//! Postgres adapter in `crate::compensation` are thin shells around it.

pub mod alerts;
pub mod bias;
pub mod distribution;
pub mod group_stats;
pub mod handlers;
pub mod pay_gap;
pub mod report;
pub mod score;
pub mod significance;
pub mod trend;

use thiserror::Error;

/// Significance threshold for two-sample tests.
pub const ALPHA: f64 = 0.05;

/// Input-shape and numeric failures raised by the analysis pipeline.
///
/// Degenerate statistics (zero variance, zero reference median) are NOT
/// errors; they resolve to documented defaults at the point of computation.
#[derive(Debug, Error, PartialEq)]
pub enum FairnessError {
    #[error("no observations supplied")]
    EmptyInput,

    #[error("length mismatch: '{field}' has {actual} values, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("'{field}' contains a non-finite value at index {index}")]
    NonFiniteValue { field: String, index: usize },

    #[error("group '{group}' has no observations")]
    EmptyGroup { group: String },

    #[error("'{field}' must contain only 0 or 1, found {value} at index {index}")]
    InvalidOutcome {
        field: String,
        index: usize,
        value: u8,
    },

    #[error("distribution error: {0}")]
    Distribution(String),
}

impl FairnessError {
    /// True for errors caused by the shape or content of caller input.
    pub fn is_validation(&self) -> bool {
        !matches!(self, FairnessError::Distribution(_))
    }
}

pub(crate) fn ensure_len(field: &str, expected: usize, actual: usize) -> Result<(), FairnessError> {
    if expected != actual {
        return Err(FairnessError::LengthMismatch {
            field: field.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn ensure_finite(field: &str, values: &[f64]) -> Result<(), FairnessError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(FairnessError::NonFiniteValue {
            field: field.to_string(),
            index,
        }),
        None => Ok(()),
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof` delta degrees of freedom (0 = population, 1 = sample).
pub(crate) fn variance(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - ddof) as f64
}

/// Ordinary least squares fit of `y` on `x`. Returns `(slope, intercept, r2)`.
///
/// Constant `x` yields slope 0; constant `y` yields r2 0.
pub(crate) fn linear_fit(x: &[f64], y: &[f64]) -> (f64, f64, f64) {
    let mx = mean(x);
    let my = mean(y);
    let sxx: f64 = x.iter().map(|xi| (xi - mx).powi(2)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(xi, yi)| (xi - mx) * (yi - my)).sum();

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = my - slope * mx;

    let ss_tot: f64 = y.iter().map(|yi| (yi - my).powi(2)).sum();
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    (slope, intercept, r2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_population_and_sample() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((variance(&v, 0) - 4.0).abs() < 1e-12);
        assert!((variance(&v, 1) - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let (slope, intercept, r2) = linear_fit(&x, &y);
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
        assert!((r2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_constant_x_has_zero_slope() {
        let (slope, _, r2) = linear_fit(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]);
        assert_eq!(slope, 0.0);
        assert_eq!(r2, 0.0);
    }

    #[test]
    fn test_ensure_finite_reports_index() {
        let err = ensure_finite("salaries", &[1.0, f64::NAN]).unwrap_err();
        assert_eq!(
            err,
            FairnessError::NonFiniteValue {
                field: "salaries".to_string(),
                index: 1
            }
        );
        assert!(err.is_validation());
    }
}
