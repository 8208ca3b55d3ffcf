use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One salary observation read from `compensation_records`, already labelled
/// with the grouping column chosen by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompensationObservationRow {
    pub salary: f64,
    pub group_label: String,
    pub effective_date: Option<NaiveDate>,
}
