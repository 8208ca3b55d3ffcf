use serde::{Deserialize, Serialize};

use crate::fairness::bias::BiasMetrics;
use crate::fairness::pay_gap::PayGapAnalysis;
use crate::fairness::trend::TrendAnalysis;

/// Component weights. Renormalized over the components actually present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairnessWeights {
    pub pay_gap: f64,
    pub bias_metrics: f64,
    pub trend: f64,
}

impl Default for FairnessWeights {
    fn default() -> Self {
        Self {
            pay_gap: 0.4,
            bias_metrics: 0.3,
            trend: 0.3,
        }
    }
}

/// A pay gap at or beyond this percentage scores zero.
const GAP_NORMALIZER_PCT: f64 = 20.0;

/// Whichever analyses ran for one report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub pay_gap: Option<PayGapAnalysis>,
    pub bias_metrics: Option<BiasMetrics>,
    pub trends: Option<TrendAnalysis>,
}

pub fn pay_gap_score(pay_gap: &PayGapAnalysis) -> f64 {
    (1.0 - pay_gap.largest_abs_gap() / GAP_NORMALIZER_PCT).clamp(0.0, 1.0)
}

/// Mean of `1 - |dp|` and `1 - |eo|` over attributes; `None` with no attributes.
pub fn bias_score(bias: &BiasMetrics) -> Option<f64> {
    if bias.is_empty() {
        return None;
    }
    let sum: f64 = bias
        .values()
        .map(|m| {
            (1.0 - m.overall.demographic_parity.abs()) + (1.0 - m.overall.equalized_odds.abs())
        })
        .sum();
    Some((sum / (2 * bias.len()) as f64).clamp(0.0, 1.0))
}

/// `None` when no metric history was long enough for a long-term fit.
pub fn trend_score(trends: &TrendAnalysis) -> Option<f64> {
    if trends.long_term_trends.is_empty() {
        return None;
    }
    Some(if trends.increasing_disparity { 0.5 } else { 1.0 })
}

/// Weighted fairness score in [0, 1]; 0.0 when no component is present.
pub fn calculate_overall_fairness_score(results: &AnalysisResults) -> f64 {
    calculate_weighted_score(results, &FairnessWeights::default())
}

pub fn calculate_weighted_score(results: &AnalysisResults, weights: &FairnessWeights) -> f64 {
    let components = [
        results.pay_gap.as_ref().map(|p| (weights.pay_gap, pay_gap_score(p))),
        results
            .bias_metrics
            .as_ref()
            .and_then(bias_score)
            .map(|s| (weights.bias_metrics, s)),
        results
            .trends
            .as_ref()
            .and_then(trend_score)
            .map(|s| (weights.trend, s)),
    ];

    let (weighted_sum, total_weight) = components
        .iter()
        .flatten()
        .fold((0.0, 0.0), |(sum, total), (w, s)| (sum + w * s, total + w));

    if total_weight > 0.0 {
        (weighted_sum / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
