//! Pay-gap analysis over stored compensation records.
//!
//! Reads `compensation_records (salary, department, position, effective_date)`
//! and feeds the rows through `fairness::pay_gap` unchanged.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::fairness::pay_gap::{compute_pay_gap, PayGapAnalysis};
use crate::models::compensation::CompensationObservationRow;
use crate::state::AppState;

/// Columns a stored pay-gap analysis may group by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Department,
    Position,
}

impl GroupBy {
    fn column(self) -> &'static str {
        match self {
            GroupBy::Department => "department",
            GroupBy::Position => "position",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompensationPayGapQuery {
    pub group_by: GroupBy,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CompensationPayGapResponse {
    pub group_by: GroupBy,
    pub observations: usize,
    /// False when any record lacks an effective date; trends are then omitted.
    pub trend_included: bool,
    pub analysis: PayGapAnalysis,
}

fn validate_window(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Result<(), AppError> {
    if let (Some(s), Some(u)) = (since, until) {
        if s > u {
            return Err(AppError::Validation(format!(
                "'since' ({s}) must not be after 'until' ({u})"
            )));
        }
    }
    Ok(())
}

/// Loads salary observations labelled by `group_by`, oldest record first.
/// Records with a NULL grouping column are labelled `unknown`.
pub async fn load_observations(
    db: &PgPool,
    group_by: GroupBy,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<Vec<CompensationObservationRow>, AppError> {
    // Column names cannot be bound; `GroupBy::column` only yields fixed identifiers.
    let sql = format!(
        r#"
        SELECT salary::float8 AS salary,
               COALESCE({column}, 'unknown') AS group_label,
               effective_date
        FROM compensation_records
        WHERE salary IS NOT NULL
          AND ($1::date IS NULL OR effective_date >= $1)
          AND ($2::date IS NULL OR effective_date <= $2)
        ORDER BY id
        "#,
        column = group_by.column()
    );

    let rows = sqlx::query_as::<_, CompensationObservationRow>(&sql)
        .bind(since)
        .bind(until)
        .fetch_all(db)
        .await?;

    debug!(rows = rows.len(), group_by = group_by.column(), "loaded compensation observations");
    Ok(rows)
}

/// Splits rows into the parallel arrays the analysis expects. Timestamps are
/// only returned when every row carries an effective date.
fn to_observations(
    rows: &[CompensationObservationRow],
) -> (Vec<f64>, Vec<String>, Option<Vec<DateTime<Utc>>>) {
    let salaries = rows.iter().map(|r| r.salary).collect();
    let groups = rows.iter().map(|r| r.group_label.clone()).collect();
    let timestamps = rows
        .iter()
        .map(|r| {
            r.effective_date
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
        .collect::<Option<Vec<_>>>();
    (salaries, groups, timestamps)
}

/// GET /api/v1/compensation/pay-gap
pub async fn handle_compensation_pay_gap(
    State(state): State<AppState>,
    Query(params): Query<CompensationPayGapQuery>,
) -> Result<Json<CompensationPayGapResponse>, AppError> {
    validate_window(params.since, params.until)?;

    let rows = load_observations(&state.db, params.group_by, params.since, params.until).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(
            "No compensation records match the requested window".to_string(),
        ));
    }

    let (salaries, groups, timestamps) = to_observations(&rows);
    let analysis = compute_pay_gap(&salaries, &groups, timestamps.as_deref())?;
    info!(
        observations = rows.len(),
        reference = %analysis.reference_group,
        "stored compensation pay gap computed"
    );

    Ok(Json(CompensationPayGapResponse {
        group_by: params.group_by,
        observations: rows.len(),
        trend_included: timestamps.is_some(),
        analysis,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(salary: f64, group: &str, date: Option<(i32, u32, u32)>) -> CompensationObservationRow {
        CompensationObservationRow {
            salary,
            group_label: group.to_string(),
            effective_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        }
    }

    #[test]
    fn test_group_by_columns_are_fixed_identifiers() {
        assert_eq!(GroupBy::Department.column(), "department");
        assert_eq!(GroupBy::Position.column(), "position");
    }

    #[test]
    fn test_inverted_window_rejected() {
        let since = NaiveDate::from_ymd_opt(2024, 6, 1);
        let until = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(matches!(
            validate_window(since, until),
            Err(AppError::Validation(_))
        ));
        assert!(validate_window(until, since).is_ok());
        assert!(validate_window(None, until).is_ok());
    }

    #[test]
    fn test_timestamps_require_every_date() {
        let dated = [
            row(50_000.0, "eng", Some((2024, 1, 1))),
            row(60_000.0, "ops", Some((2024, 2, 1))),
        ];
        let (salaries, groups, timestamps) = to_observations(&dated);
        assert_eq!(salaries, vec![50_000.0, 60_000.0]);
        assert_eq!(groups, vec!["eng".to_string(), "ops".to_string()]);
        assert_eq!(timestamps.unwrap().len(), 2);

        let partial = [row(50_000.0, "eng", Some((2024, 1, 1))), row(1.0, "ops", None)];
        assert!(to_observations(&partial).2.is_none());
    }
}
