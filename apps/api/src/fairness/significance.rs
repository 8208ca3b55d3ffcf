use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::fairness::{ensure_finite, mean, variance, FairnessError, ALPHA};

/// Cohen's d magnitude bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EffectSize {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectSize {
    pub const SMALL: f64 = 0.2;
    pub const MEDIUM: f64 = 0.5;
    pub const LARGE: f64 = 0.8;

    pub fn from_cohens_d(d: f64) -> Self {
        let magnitude = d.abs();
        if magnitude >= Self::LARGE {
            EffectSize::Large
        } else if magnitude >= Self::MEDIUM {
            EffectSize::Medium
        } else if magnitude >= Self::SMALL {
            EffectSize::Small
        } else {
            EffectSize::Negligible
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignificanceResult {
    pub t_statistic: f64,
    pub p_value: f64,
    pub cohens_d: f64,
    pub effect_size: EffectSize,
    pub significant: bool,
    /// Set when the pooled variance was zero or there were no residual
    /// degrees of freedom; the numeric fields then hold the neutral defaults.
    pub degenerate: bool,
}

impl SignificanceResult {
    fn degenerate() -> Self {
        Self {
            t_statistic: 0.0,
            p_value: 1.0,
            cohens_d: 0.0,
            effect_size: EffectSize::Negligible,
            significant: false,
            degenerate: true,
        }
    }
}

/// Two-sample Student's t-test (pooled variance) with Cohen's d.
///
/// Cohen's d divides by population variances pooled with `n - 1` weights.
///
/// Positive `t_statistic` / `cohens_d` mean `group1` has the higher mean.
/// Both groups must be non-empty. When the pooled standard deviation is zero
/// (within rounding of the group means) or `n1 + n2 - 2 < 1`, the result is the degenerate default
/// (t = 0, p = 1, d = 0, not significant).
pub fn compute_statistical_significance(
    group1: &[f64],
    group2: &[f64],
) -> Result<SignificanceResult, FairnessError> {
    if group1.is_empty() {
        return Err(FairnessError::EmptyGroup {
            group: "group1".to_string(),
        });
    }
    if group2.is_empty() {
        return Err(FairnessError::EmptyGroup {
            group: "group2".to_string(),
        });
    }
    ensure_finite("group1", group1)?;
    ensure_finite("group2", group2)?;

    let n1 = group1.len() as f64;
    let n2 = group2.len() as f64;
    let dof = n1 + n2 - 2.0;
    if dof < 1.0 {
        return Ok(SignificanceResult::degenerate());
    }

    let mean1 = mean(group1);
    let mean2 = mean(group2);
    let pooled = |ddof: usize| {
        (((n1 - 1.0) * variance(group1, ddof) + (n2 - 1.0) * variance(group2, ddof)) / dof).sqrt()
    };
    // t uses sample variances; Cohen's d pools population variances.
    let pooled_sd = pooled(1);
    let effect_sd = pooled(0);

    // Rounding leaves residue in the variance of constant decimal groups.
    let zero_tolerance = f64::EPSILON * 16.0 * mean1.abs().max(mean2.abs()).max(1.0);
    if pooled_sd.is_nan() || pooled_sd <= zero_tolerance || effect_sd <= zero_tolerance {
        return Ok(SignificanceResult::degenerate());
    }

    let mean_diff = mean1 - mean2;
    let t_statistic = mean_diff / (pooled_sd * (1.0 / n1 + 1.0 / n2).sqrt());
    let cohens_d = mean_diff / effect_sd;

    let t_dist =
        StudentsT::new(0.0, 1.0, dof).map_err(|e| FairnessError::Distribution(e.to_string()))?;
    let p_value = (2.0 * (1.0 - t_dist.cdf(t_statistic.abs()))).clamp(0.0, 1.0);

    Ok(SignificanceResult {
        t_statistic,
        p_value,
        cohens_d,
        effect_size: EffectSize::from_cohens_d(cohens_d),
        significant: p_value < ALPHA,
        degenerate: false,
    })
}
