//! Bias metrics over binary outcomes, behind a pluggable provider.
//!
//! `AppState` holds an `Arc<dyn BiasMetricProvider>` chosen at startup.
//! `UnavailableBiasMetrics` is the null object: it reports "not computed"
//! instead of returning made-up numbers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fairness::{ensure_len, FairnessError};

/// Per-group rate gap vs overall above which a disparity is flagged.
pub const DISPARITY_THRESHOLD: f64 = 0.1;

/// Binary outcomes (1 = favourable, e.g. high pay band) aligned with
/// protected-attribute labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeData {
    pub y_true: Vec<u8>,
    pub y_pred: Vec<u8>,
    pub sensitive_features: BTreeMap<String, Vec<String>>,
}

impl OutcomeData {
    pub fn validate(&self) -> Result<(), FairnessError> {
        if self.y_true.is_empty() {
            return Err(FairnessError::EmptyInput);
        }
        let n = self.y_true.len();
        ensure_len("y_pred", n, self.y_pred.len())?;
        for (field, values) in [("y_true", &self.y_true), ("y_pred", &self.y_pred)] {
            if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| **v > 1) {
                return Err(FairnessError::InvalidOutcome {
                    field: field.to_string(),
                    index,
                    value,
                });
            }
        }
        for (name, labels) in &self.sensitive_features {
            ensure_len(&format!("sensitive_features.{name}"), n, labels.len())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RateMetrics {
    pub selection_rate: f64,
    pub true_positive_rate: f64,
    pub false_positive_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateMetric {
    SelectionRate,
    TruePositiveRate,
    FalsePositiveRate,
}

impl RateMetric {
    pub const ALL: [RateMetric; 3] = [
        RateMetric::SelectionRate,
        RateMetric::TruePositiveRate,
        RateMetric::FalsePositiveRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RateMetric::SelectionRate => "selection_rate",
            RateMetric::TruePositiveRate => "true_positive_rate",
            RateMetric::FalsePositiveRate => "false_positive_rate",
        }
    }
}

impl RateMetrics {
    pub fn get(&self, metric: RateMetric) -> f64 {
        match metric {
            RateMetric::SelectionRate => self.selection_rate,
            RateMetric::TruePositiveRate => self.true_positive_rate,
            RateMetric::FalsePositiveRate => self.false_positive_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverallBiasMetrics {
    #[serde(flatten)]
    pub rates: RateMetrics,
    /// Spread between the highest and lowest group selection rate.
    pub demographic_parity: f64,
    /// Larger of the TPR spread and FPR spread across groups.
    pub equalized_odds: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Above,
    Below,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSignificance {
    pub difference: f64,
    pub significant: bool,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeBiasMetrics {
    pub overall: OverallBiasMetrics,
    pub by_group: BTreeMap<String, RateMetrics>,
    /// metric name → group → deviation from the overall rate.
    pub metric_significance: BTreeMap<String, BTreeMap<String, MetricSignificance>>,
}

impl AttributeBiasMetrics {
    /// Metrics with at least one group deviating beyond the threshold.
    pub fn significant_disparities(&self) -> Vec<String> {
        self.metric_significance
            .iter()
            .filter(|(_, groups)| groups.values().any(|s| s.significant))
            .map(|(metric, _)| metric.clone())
            .collect()
    }
}

/// Attribute name (or `a_x_b` intersection) → metrics.
pub type BiasMetrics = BTreeMap<String, AttributeBiasMetrics>;

pub trait BiasMetricProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means this provider cannot compute bias metrics.
    fn compute(&self, outcomes: &OutcomeData) -> Result<Option<BiasMetrics>, FairnessError>;
}

/// Null provider for deployments that disable bias metrics.
pub struct UnavailableBiasMetrics;

impl BiasMetricProvider for UnavailableBiasMetrics {
    fn name(&self) -> &'static str {
        "none"
    }

    fn compute(&self, _outcomes: &OutcomeData) -> Result<Option<BiasMetrics>, FairnessError> {
        Ok(None)
    }
}

/// Rate-based metrics: selection rate, TPR and FPR per group, demographic
/// parity and equalized odds differences, plus pairwise intersections of
/// every two attributes.
pub struct RateDisparityMetrics;

impl BiasMetricProvider for RateDisparityMetrics {
    fn name(&self) -> &'static str {
        "rate_disparity"
    }

    fn compute(&self, outcomes: &OutcomeData) -> Result<Option<BiasMetrics>, FairnessError> {
        outcomes.validate()?;
        let mut results = BiasMetrics::new();

        for (name, labels) in &outcomes.sensitive_features {
            results.insert(
                name.clone(),
                attribute_metrics(&outcomes.y_true, &outcomes.y_pred, labels),
            );
        }

        let names: Vec<&String> = outcomes.sensitive_features.keys().collect();
        for (i, first) in names.iter().enumerate() {
            for second in &names[i + 1..] {
                let combined: Vec<String> = outcomes.sensitive_features[*first]
                    .iter()
                    .zip(&outcomes.sensitive_features[*second])
                    .map(|(a, b)| format!("{a}_{b}"))
                    .collect();
                results.insert(
                    format!("{first}_x_{second}"),
                    attribute_metrics(&outcomes.y_true, &outcomes.y_pred, &combined),
                );
            }
        }

        Ok(Some(results))
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn rates(y_true: &[u8], y_pred: &[u8], idx: impl Iterator<Item = usize>) -> RateMetrics {
    let (mut n, mut selected, mut pos, mut tp, mut neg, mut fp) = (0, 0, 0, 0, 0, 0);
    for i in idx {
        n += 1;
        let predicted = y_pred[i] == 1;
        if predicted {
            selected += 1;
        }
        if y_true[i] == 1 {
            pos += 1;
            if predicted {
                tp += 1;
            }
        } else {
            neg += 1;
            if predicted {
                fp += 1;
            }
        }
    }
    RateMetrics {
        selection_rate: ratio(selected, n),
        true_positive_rate: ratio(tp, pos),
        false_positive_rate: ratio(fp, neg),
    }
}

fn spread(values: impl Iterator<Item = f64>) -> f64 {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if hi >= lo {
        hi - lo
    } else {
        0.0
    }
}

fn attribute_metrics(y_true: &[u8], y_pred: &[u8], labels: &[String]) -> AttributeBiasMetrics {
    let mut members: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        members.entry(label.clone()).or_default().push(i);
    }

    let overall_rates = rates(y_true, y_pred, 0..y_true.len());
    let by_group: BTreeMap<String, RateMetrics> = members
        .iter()
        .map(|(label, idx)| (label.clone(), rates(y_true, y_pred, idx.iter().copied())))
        .collect();

    let demographic_parity = spread(by_group.values().map(|r| r.selection_rate));
    let equalized_odds = spread(by_group.values().map(|r| r.true_positive_rate))
        .max(spread(by_group.values().map(|r| r.false_positive_rate)));

    let metric_significance = RateMetric::ALL
        .into_iter()
        .map(|metric| {
            let overall = overall_rates.get(metric);
            let per_group = by_group
                .iter()
                .map(|(label, r)| {
                    let value = r.get(metric);
                    let difference = (value - overall).abs();
                    (
                        label.clone(),
                        MetricSignificance {
                            difference,
                            significant: difference > DISPARITY_THRESHOLD,
                            direction: if value > overall {
                                Direction::Above
                            } else {
                                Direction::Below
                            },
                        },
                    )
                })
                .collect();
            (metric.as_str().to_string(), per_group)
        })
        .collect();

    AttributeBiasMetrics {
        overall: OverallBiasMetrics {
            rates: overall_rates,
            demographic_parity,
            equalized_odds,
        },
        by_group,
        metric_significance,
    }
}
