//! Temporal trends: per-group salary drift over calendar time, and
//! long-term / seasonal / anomaly analysis of historical fairness metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fairness::{linear_fit, mean, variance};

/// A group's salary trend counts as significant above this R².
pub const SALARY_TREND_R2: f64 = 0.6;
/// A rising metric with R² above this is flagged as concerning.
pub const CONCERNING_R2: f64 = 0.7;
pub const MIN_LONG_TERM_PERIODS: usize = 4;
pub const SEASONAL_PERIOD: usize = 12;
pub const ANOMALY_Z_THRESHOLD: f64 = 2.0;
const MIN_ANOMALY_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl TrendDirection {
    fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalaryTrend {
    /// Salary change per day.
    pub slope: f64,
    pub r2: f64,
    pub trend_direction: TrendDirection,
    pub significant: bool,
}

/// Fits salary against whole days elapsed since the earliest timestamp.
///
/// `values` and `timestamps` are index-aligned and non-empty.
pub fn fit_salary_trend(values: &[f64], timestamps: &[DateTime<Utc>]) -> SalaryTrend {
    let t0 = timestamps.iter().min().copied().unwrap_or_else(Utc::now);
    let days: Vec<f64> = timestamps
        .iter()
        .map(|t| (*t - t0).num_days() as f64)
        .collect();

    let (slope, _, r2) = linear_fit(&days, values);

    SalaryTrend {
        slope,
        r2,
        trend_direction: TrendDirection::from_slope(slope),
        significant: r2 > SALARY_TREND_R2,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LongTermTrend {
    pub direction: TrendDirection,
    /// Absolute slope per period.
    pub strength: f64,
    /// R² of the linear fit.
    pub significance: f64,
    pub concerning: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonalPattern {
    pub seasonal_effect: f64,
    pub consistency: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendAnomalies {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
    pub z_scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TrendAnalysis {
    pub long_term_trends: BTreeMap<String, LongTermTrend>,
    pub seasonal_patterns: BTreeMap<String, SeasonalPattern>,
    pub anomalies: BTreeMap<String, TrendAnomalies>,
    /// True when any metric shows a concerning long-term rise.
    pub increasing_disparity: bool,
}

impl TrendAnalysis {
    pub fn concerning_metrics(&self) -> Vec<&str> {
        self.long_term_trends
            .iter()
            .filter(|(_, t)| t.concerning)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Analyzes each historical metric series (one value per period, oldest first).
/// Series too short for a given analysis are left out of that analysis.
pub fn analyze_fairness_trends(historical_metrics: &BTreeMap<String, Vec<f64>>) -> TrendAnalysis {
    let mut analysis = TrendAnalysis::default();

    for (name, values) in historical_metrics {
        if let Some(trend) = long_term_trend(values) {
            analysis.long_term_trends.insert(name.clone(), trend);
        }
        if let Some(pattern) = seasonal_pattern(values, SEASONAL_PERIOD) {
            analysis.seasonal_patterns.insert(name.clone(), pattern);
        }
        if let Some(anomalies) = trend_anomalies(values, ANOMALY_Z_THRESHOLD) {
            analysis.anomalies.insert(name.clone(), anomalies);
        }
    }

    analysis.increasing_disparity = analysis.long_term_trends.values().any(|t| t.concerning);
    analysis
}

fn long_term_trend(values: &[f64]) -> Option<LongTermTrend> {
    if values.len() < MIN_LONG_TERM_PERIODS {
        return None;
    }
    let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let (slope, _, r2) = linear_fit(&x, values);

    Some(LongTermTrend {
        direction: TrendDirection::from_slope(slope),
        strength: slope.abs(),
        significance: r2,
        concerning: slope > 0.0 && r2 > CONCERNING_R2,
    })
}

fn seasonal_pattern(values: &[f64], period: usize) -> Option<SeasonalPattern> {
    if period == 0 || values.len() < period * 2 {
        return None;
    }
    let diffs: Vec<f64> = (0..values.len() - period)
        .map(|i| values[i + period] - values[i])
        .collect();

    let mean_abs = mean(&diffs.iter().map(|d| d.abs()).collect::<Vec<_>>());
    if mean_abs == 0.0 {
        // Perfect repetition with no year-over-year movement.
        return Some(SeasonalPattern {
            seasonal_effect: 0.0,
            consistency: 1.0,
            significant: false,
        });
    }
    let ratio = variance(&diffs, 0).sqrt() / mean_abs;

    Some(SeasonalPattern {
        seasonal_effect: mean(&diffs),
        consistency: 1.0 / (1.0 + ratio),
        significant: ratio < 0.5,
    })
}

fn trend_anomalies(values: &[f64], z_threshold: f64) -> Option<TrendAnomalies> {
    if values.len() < MIN_ANOMALY_POINTS {
        return None;
    }
    let m = mean(values);
    let sd = variance(values, 0).sqrt();
    if sd == 0.0 {
        return None;
    }

    let mut found = TrendAnomalies {
        indices: vec![],
        values: vec![],
        z_scores: vec![],
    };
    for (i, v) in values.iter().enumerate() {
        let z = ((v - m) / sd).abs();
        if z > z_threshold {
            found.indices.push(i);
            found.values.push(*v);
            found.z_scores.push(z);
        }
    }

    if found.indices.is_empty() {
        None
    } else {
        Some(found)
    }
}
