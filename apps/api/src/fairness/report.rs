//! Fairness report assembly.
//!
//! `run_fairness_analysis` drives the whole pipeline for one request;
//! `generate_fairness_report` turns whatever analyses ran into the summary,
//! detailed findings, alerts and rule-based recommendations. Every branch that
//! did not run is listed in `skipped_analyses` with the reason.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::fairness::alerts::{bias_alerts, AlertThresholds, MetricAlert};
use crate::fairness::bias::{BiasMetricProvider, OutcomeData};
use crate::fairness::distribution::{summarize_demographics, DemographicSummary};
use crate::fairness::group_stats::GroupStatistics;
use crate::fairness::pay_gap::{compute_pay_gap, GroupGap};
use crate::fairness::score::{calculate_overall_fairness_score, AnalysisResults};
use crate::fairness::trend::{analyze_fairness_trends, TrendAnalysis, MIN_LONG_TERM_PERIODS};
use crate::fairness::{ensure_len, FairnessError};

/// Largest pay gap (percent) above which remediation is recommended.
pub const PAY_GAP_ALERT_PCT: f64 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairnessAnalysisRequest {
    pub salaries: Vec<f64>,
    pub groups: Vec<String>,
    #[serde(default)]
    pub timestamps: Option<Vec<DateTime<Utc>>>,
    #[serde(default)]
    pub outcomes: Option<OutcomeData>,
    /// Metric name → one value per period, oldest first.
    #[serde(default)]
    pub historical_metrics: Option<BTreeMap<String, Vec<f64>>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    PayEquity,
    BiasMitigation,
    TrendMitigation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub actions: Vec<String>,
    pub impact: String,
    pub effort: String,
    pub timeframe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub overall_fairness_score: f64,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayEquityFindings {
    pub reference_group: String,
    pub group_stats: BTreeMap<String, GroupStatistics>,
    pub gaps: BTreeMap<String, GroupGap>,
    /// Any gap backed by a significant t-test.
    pub statistical_significance: bool,
    pub largest_gap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasFindings {
    pub demographic_parity: f64,
    pub equalized_odds: f64,
    pub significant_disparities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub pay_equity: Option<PayEquityFindings>,
    pub bias_metrics: Option<BTreeMap<String, BiasFindings>>,
    pub trend_analysis: Option<TrendAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedAnalysis {
    pub analysis: String,
    pub reason: String,
}

impl SkippedAnalysis {
    fn new(analysis: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        info!(analysis, %reason, "fairness analysis skipped");
        Self {
            analysis: analysis.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairnessReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub detailed_analysis: DetailedAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<DemographicSummary>,
    pub alerts: Vec<MetricAlert>,
    pub skipped_analyses: Vec<SkippedAnalysis>,
}

/// Runs pay-gap, bias and trend analyses for one request and assembles the
/// report. Validation failures propagate; branches without input are skipped.
pub fn run_fairness_analysis(
    request: &FairnessAnalysisRequest,
    bias_provider: &dyn BiasMetricProvider,
    thresholds: &AlertThresholds,
) -> Result<FairnessReport, FairnessError> {
    let mut skipped = Vec::new();

    let pay_gap = compute_pay_gap(
        &request.salaries,
        &request.groups,
        request.timestamps.as_deref(),
    )?;
    if request.timestamps.is_none() {
        skipped.push(SkippedAnalysis::new("salary_trends", "no timestamps supplied"));
    }
    let demographics = summarize_demographics(&request.salaries, &request.groups)?;

    if let Some(outcomes) = &request.outcomes {
        ensure_len("outcomes.y_true", request.salaries.len(), outcomes.y_true.len())?;
    }
    let bias_metrics = match &request.outcomes {
        None => {
            skipped.push(SkippedAnalysis::new("bias_metrics", "no outcome data supplied"));
            None
        }
        Some(outcomes) => match bias_provider.compute(outcomes)? {
            None => {
                skipped.push(SkippedAnalysis::new(
                    "bias_metrics",
                    format!("bias metric provider '{}' is unavailable", bias_provider.name()),
                ));
                None
            }
            Some(metrics) if metrics.is_empty() => {
                skipped.push(SkippedAnalysis::new(
                    "bias_metrics",
                    "no sensitive features supplied",
                ));
                None
            }
            Some(metrics) => Some(metrics),
        },
    };

    let trends = match &request.historical_metrics {
        Some(history) if !history.is_empty() => {
            let analysis = analyze_fairness_trends(history);
            if analysis.long_term_trends.is_empty() {
                skipped.push(SkippedAnalysis::new(
                    "trend_analysis",
                    format!(
                        "insufficient history: every metric has fewer than {MIN_LONG_TERM_PERIODS} periods"
                    ),
                ));
                None
            } else {
                Some(analysis)
            }
        }
        _ => {
            skipped.push(SkippedAnalysis::new(
                "trend_analysis",
                "no historical metrics supplied",
            ));
            None
        }
    };

    let results = AnalysisResults {
        pay_gap: Some(pay_gap),
        bias_metrics,
        trends,
    };

    let mut report = generate_fairness_report(&results, thresholds);
    report.demographics = Some(demographics);
    report.skipped_analyses = skipped;
    Ok(report)
}

/// Builds the report from already computed results. Absent components are
/// simply left out of the score and the detailed findings.
pub fn generate_fairness_report(
    results: &AnalysisResults,
    thresholds: &AlertThresholds,
) -> FairnessReport {
    let overall_fairness_score = calculate_overall_fairness_score(results);
    let mut critical_issues = Vec::new();

    let pay_equity = results.pay_gap.as_ref().map(|analysis| PayEquityFindings {
        reference_group: analysis.reference_group.clone(),
        group_stats: analysis.group_stats.clone(),
        gaps: analysis.gaps.clone(),
        statistical_significance: analysis.any_significant(),
        largest_gap: analysis.largest_gap(),
    });
    if pay_equity
        .as_ref()
        .is_some_and(|p| p.largest_gap > PAY_GAP_ALERT_PCT)
    {
        critical_issues.push("Significant pay gaps detected exceeding 5%".to_string());
    }

    let bias_findings = results.bias_metrics.as_ref().map(|metrics| {
        metrics
            .iter()
            .map(|(attr, m)| {
                (
                    attr.clone(),
                    BiasFindings {
                        demographic_parity: m.overall.demographic_parity,
                        equalized_odds: m.overall.equalized_odds,
                        significant_disparities: m.significant_disparities(),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>()
    });

    let alerts = results
        .bias_metrics
        .as_ref()
        .map(|m| bias_alerts(m, thresholds))
        .unwrap_or_default();

    let detailed_analysis = DetailedAnalysis {
        pay_equity,
        bias_metrics: bias_findings,
        trend_analysis: results.trends.clone(),
    };
    let recommendations = generate_recommendations(&detailed_analysis);

    debug!(
        score = overall_fairness_score,
        recommendations = recommendations.len(),
        alerts = alerts.len(),
        "fairness report generated"
    );

    FairnessReport {
        report_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        summary: ReportSummary {
            overall_fairness_score,
            critical_issues,
            recommendations,
        },
        detailed_analysis,
        demographics: None,
        alerts,
        skipped_analyses: vec![],
    }
}

fn actions(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Fixed rule list; each matching rule contributes one recommendation.
pub fn generate_recommendations(analysis: &DetailedAnalysis) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if let Some(equity) = &analysis.pay_equity {
        if equity.largest_gap > PAY_GAP_ALERT_PCT {
            recommendations.push(Recommendation {
                category: RecommendationCategory::PayEquity,
                priority: Priority::High,
                title: "Address Significant Pay Gaps".to_string(),
                description: "Significant pay gaps exceeding 5% detected".to_string(),
                actions: actions(&[
                    "Review compensation policies",
                    "Conduct pay adjustment analysis",
                    "Develop remediation plan",
                ]),
                impact: "high".to_string(),
                effort: "medium".to_string(),
                timeframe: "immediate".to_string(),
            });
        }
    }

    if let Some(bias) = &analysis.bias_metrics {
        for (attr, findings) in bias {
            if findings.significant_disparities.is_empty() {
                continue;
            }
            recommendations.push(Recommendation {
                category: RecommendationCategory::BiasMitigation,
                priority: Priority::High,
                title: format!("Address {attr} Bias"),
                description: format!("Significant disparities detected in {attr}"),
                actions: actions(&[
                    "Review decision processes",
                    "Implement bias mitigation strategies",
                    "Monitor outcomes closely",
                ]),
                impact: "high".to_string(),
                effort: "high".to_string(),
                timeframe: "short_term".to_string(),
            });
        }
    }

    if let Some(trends) = &analysis.trend_analysis {
        if !trends.concerning_metrics().is_empty() {
            recommendations.push(Recommendation {
                category: RecommendationCategory::TrendMitigation,
                priority: Priority::Medium,
                title: "Address Negative Trends".to_string(),
                description: "Concerning long-term trends detected".to_string(),
                actions: actions(&[
                    "Analyze root causes",
                    "Develop intervention strategy",
                    "Set up monitoring system",
                ]),
                impact: "medium".to_string(),
                effort: "medium".to_string(),
                timeframe: "medium_term".to_string(),
            });
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::bias::{RateDisparityMetrics, UnavailableBiasMetrics};

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn gapped_request() -> FairnessAnalysisRequest {
        FairnessAnalysisRequest {
            salaries: vec![100_000.0, 102_000.0, 98_000.0, 80_000.0, 82_000.0],
            groups: labels(&["m", "m", "m", "f", "f"]),
            timestamps: None,
            outcomes: None,
            historical_metrics: None,
        }
    }

    fn skipped_names(report: &FairnessReport) -> Vec<&str> {
        report
            .skipped_analyses
            .iter()
            .map(|s| s.analysis.as_str())
            .collect()
    }

    #[test]
    fn test_large_gap_produces_pay_equity_recommendation() {
        let report = run_fairness_analysis(
            &gapped_request(),
            &RateDisparityMetrics,
            &AlertThresholds::default(),
        )
        .unwrap();

        let equity = report.detailed_analysis.pay_equity.as_ref().unwrap();
        assert_eq!(equity.reference_group, "m");
        assert!(equity.largest_gap > 5.0);
        assert_eq!(report.summary.recommendations.len(), 1);
        let rec = &report.summary.recommendations[0];
        assert_eq!(rec.category, RecommendationCategory::PayEquity);
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.timeframe, "immediate");
        assert_eq!(
            report.summary.critical_issues,
            vec!["Significant pay gaps detected exceeding 5%".to_string()]
        );
    }

    #[test]
    fn test_missing_inputs_are_reported_as_skipped() {
        let report = run_fairness_analysis(
            &gapped_request(),
            &RateDisparityMetrics,
            &AlertThresholds::default(),
        )
        .unwrap();
        assert_eq!(
            skipped_names(&report),
            vec!["salary_trends", "bias_metrics", "trend_analysis"]
        );
        assert!(report.detailed_analysis.bias_metrics.is_none());
        assert!(report.detailed_analysis.trend_analysis.is_none());
    }

    #[test]
    fn test_unavailable_provider_is_skipped_not_fabricated() {
        let mut request = gapped_request();
        request.outcomes = Some(OutcomeData {
            y_true: vec![1, 1, 0, 1, 0],
            y_pred: vec![1, 1, 0, 0, 0],
            sensitive_features: BTreeMap::from([("gender".to_string(), request.groups.clone())]),
        });

        let report =
            run_fairness_analysis(&request, &UnavailableBiasMetrics, &AlertThresholds::default())
                .unwrap();

        assert!(report.detailed_analysis.bias_metrics.is_none());
        let skipped = report
            .skipped_analyses
            .iter()
            .find(|s| s.analysis == "bias_metrics")
            .unwrap();
        assert_eq!(skipped.reason, "bias metric provider 'none' is unavailable");
        assert!(report.alerts.is_empty());
    }

    #[test]
    fn test_bias_disparity_recommendation_and_alerts() {
        let mut request = gapped_request();
        request.outcomes = Some(OutcomeData {
            y_true: vec![1, 1, 1, 1, 1],
            y_pred: vec![1, 1, 1, 0, 0],
            sensitive_features: BTreeMap::from([("gender".to_string(), request.groups.clone())]),
        });

        let report =
            run_fairness_analysis(&request, &RateDisparityMetrics, &AlertThresholds::default())
                .unwrap();

        let findings = &report.detailed_analysis.bias_metrics.as_ref().unwrap()["gender"];
        assert_eq!(findings.demographic_parity, 1.0);
        assert!(report
            .summary
            .recommendations
            .iter()
            .any(|r| r.category == RecommendationCategory::BiasMitigation
                && r.title == "Address gender Bias"));
        assert_eq!(report.alerts.len(), 2);
    }

    #[test]
    fn test_short_history_is_skipped_and_not_scored() {
        let mut request = gapped_request();
        request.salaries = vec![100.0, 100.0, 100.0, 90.0, 90.0];
        request.historical_metrics =
            Some(BTreeMap::from([("gender_gap".to_string(), vec![0.3, 0.9])]));

        let report =
            run_fairness_analysis(&request, &RateDisparityMetrics, &AlertThresholds::default())
                .unwrap();

        assert_eq!(
            skipped_names(&report),
            vec!["salary_trends", "bias_metrics", "trend_analysis"]
        );
        let trend_skip = report.skipped_analyses.last().unwrap();
        assert!(trend_skip.reason.starts_with("insufficient history"));
        assert!(report.detailed_analysis.trend_analysis.is_none());
        // 10% gap scores 0.5 on its own
        assert!((report.summary.overall_fairness_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_outcomes_must_align_with_salaries() {
        let mut request = gapped_request();
        request.outcomes = Some(OutcomeData {
            y_true: vec![1, 0],
            y_pred: vec![1, 0],
            sensitive_features: BTreeMap::from([("gender".to_string(), labels(&["m", "f"]))]),
        });

        let err =
            run_fairness_analysis(&request, &RateDisparityMetrics, &AlertThresholds::default())
                .unwrap_err();
        assert_eq!(
            err,
            FairnessError::LengthMismatch {
                field: "outcomes.y_true".to_string(),
                expected: 5,
                actual: 2
            }
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_concerning_trend_recommendation() {
        let mut request = gapped_request();
        request.salaries = vec![100.0, 100.0, 100.0, 100.0, 100.0];
        request.historical_metrics = Some(BTreeMap::from([(
            "gender_gap".to_string(),
            vec![0.01, 0.02, 0.03, 0.04],
        )]));

        let report =
            run_fairness_analysis(&request, &RateDisparityMetrics, &AlertThresholds::default())
                .unwrap();

        assert_eq!(report.summary.recommendations.len(), 1);
        assert_eq!(
            report.summary.recommendations[0].category,
            RecommendationCategory::TrendMitigation
        );
        // pay gap 1.0 * 0.4 + trend 0.5 * 0.3, over 0.7
        let expected = (0.4 + 0.15) / 0.7;
        assert!((report.summary.overall_fairness_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_generate_report_without_components() {
        let report =
            generate_fairness_report(&AnalysisResults::default(), &AlertThresholds::default());
        assert_eq!(report.summary.overall_fairness_score, 0.0);
        assert!(report.summary.recommendations.is_empty());
        assert!(report.detailed_analysis.pay_equity.is_none());
    }

    #[test]
    fn test_validation_error_propagates() {
        let mut request = gapped_request();
        request.groups.pop();
        let err =
            run_fairness_analysis(&request, &RateDisparityMetrics, &AlertThresholds::default())
                .unwrap_err();
        assert!(matches!(err, FairnessError::LengthMismatch { .. }));
    }
}
