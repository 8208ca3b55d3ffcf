use std::collections::BTreeMap;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::fairness::distribution::{summarize_demographics, DemographicSummary};
use crate::fairness::group_stats::{compute_group_statistics, GroupStatistics};
use crate::fairness::pay_gap::{compute_pay_gap, PayGapAnalysis};
use crate::fairness::report::{run_fairness_analysis, FairnessAnalysisRequest, FairnessReport};
use crate::fairness::significance::{compute_statistical_significance, SignificanceResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignificanceRequest {
    pub group1: Vec<f64>,
    pub group2: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct PayGapRequest {
    pub salaries: Vec<f64>,
    pub groups: Vec<String>,
    #[serde(default)]
    pub timestamps: Option<Vec<DateTime<Utc>>>,
}

#[derive(Debug, Deserialize)]
pub struct DistributionRequest {
    pub salaries: Vec<f64>,
    pub groups: Vec<String>,
}

/// POST /api/v1/fairness/significance
pub async fn handle_significance(
    Json(req): Json<SignificanceRequest>,
) -> Result<Json<SignificanceResult>, AppError> {
    Ok(Json(compute_statistical_significance(&req.group1, &req.group2)?))
}

/// POST /api/v1/fairness/group-stats
pub async fn handle_group_stats(
    Json(req): Json<PayGapRequest>,
) -> Result<Json<BTreeMap<String, GroupStatistics>>, AppError> {
    let stats = compute_group_statistics(&req.salaries, &req.groups, req.timestamps.as_deref())?;
    Ok(Json(stats))
}

/// POST /api/v1/fairness/pay-gap
pub async fn handle_pay_gap(
    Json(req): Json<PayGapRequest>,
) -> Result<Json<PayGapAnalysis>, AppError> {
    let analysis = compute_pay_gap(&req.salaries, &req.groups, req.timestamps.as_deref())?;
    Ok(Json(analysis))
}

/// POST /api/v1/fairness/distribution
pub async fn handle_distribution(
    Json(req): Json<DistributionRequest>,
) -> Result<Json<DemographicSummary>, AppError> {
    Ok(Json(summarize_demographics(&req.salaries, &req.groups)?))
}

/// POST /api/v1/fairness/report
pub async fn handle_report(
    State(state): State<AppState>,
    Json(req): Json<FairnessAnalysisRequest>,
) -> Result<Json<FairnessReport>, AppError> {
    let report = run_fairness_analysis(
        &req,
        state.bias_provider.as_ref(),
        &state.config.alert_thresholds,
    )?;
    info!(
        report_id = %report.report_id,
        score = report.summary.overall_fairness_score,
        skipped = report.skipped_analyses.len(),
        "fairness report served"
    );
    Ok(Json(report))
}
