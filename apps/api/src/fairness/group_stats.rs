use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fairness::trend::{fit_salary_trend, SalaryTrend};
use crate::fairness::{ensure_finite, ensure_len, mean, variance, FairnessError};

/// Descriptive statistics for one group's salaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupStatistics {
    pub mean_salary: f64,
    pub median_salary: f64,
    /// Population standard deviation.
    pub std_salary: f64,
    pub count: usize,
    /// 25th, 50th and 75th percentiles.
    pub quartiles: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<SalaryTrend>,
}

/// Observations partitioned by group label, keeping first-encounter order.
pub(crate) struct Partition {
    pub order: Vec<String>,
    pub members: BTreeMap<String, Vec<usize>>,
}

impl Partition {
    pub fn new(groups: &[String]) -> Self {
        let mut order = Vec::new();
        let mut members: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, g) in groups.iter().enumerate() {
            let slot = members.entry(g.clone()).or_default();
            if slot.is_empty() {
                order.push(g.clone());
            }
            slot.push(i);
        }
        Self { order, members }
    }

    pub fn values(&self, group: &str, source: &[f64]) -> Vec<f64> {
        self.members
            .get(group)
            .map(|idx| idx.iter().map(|&i| source[i]).collect())
            .unwrap_or_default()
    }
}

/// Validates the parallel observation arrays shared by every salary analysis.
pub(crate) fn validate_observations(
    salaries: &[f64],
    groups: &[String],
    timestamps: Option<&[DateTime<Utc>]>,
) -> Result<(), FairnessError> {
    if salaries.is_empty() {
        return Err(FairnessError::EmptyInput);
    }
    ensure_len("groups", salaries.len(), groups.len())?;
    if let Some(ts) = timestamps {
        ensure_len("timestamps", salaries.len(), ts.len())?;
    }
    ensure_finite("salaries", salaries)
}

/// Linear-interpolation percentile over an ascending slice, `p` in [0, 100].
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile(&sorted, 50.0)
}

/// Statistics for a single non-empty group, without a trend.
pub fn describe(values: &[f64]) -> GroupStatistics {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let quartiles = [
        percentile(&sorted, 25.0),
        percentile(&sorted, 50.0),
        percentile(&sorted, 75.0),
    ];

    GroupStatistics {
        mean_salary: mean(values),
        median_salary: quartiles[1],
        std_salary: variance(values, 0).sqrt(),
        count: values.len(),
        quartiles,
        trend: None,
    }
}

/// Per-group statistics keyed by group label. A salary trend is attached to
/// every group when `timestamps` is supplied.
pub fn compute_group_statistics(
    salaries: &[f64],
    groups: &[String],
    timestamps: Option<&[DateTime<Utc>]>,
) -> Result<BTreeMap<String, GroupStatistics>, FairnessError> {
    validate_observations(salaries, groups, timestamps)?;
    let partition = Partition::new(groups);
    Ok(statistics_for(&partition, salaries, timestamps))
}

pub(crate) fn statistics_for(
    partition: &Partition,
    salaries: &[f64],
    timestamps: Option<&[DateTime<Utc>]>,
) -> BTreeMap<String, GroupStatistics> {
    partition
        .members
        .iter()
        .map(|(label, idx)| {
            let values: Vec<f64> = idx.iter().map(|&i| salaries[i]).collect();
            let mut stats = describe(&values);
            if let Some(ts) = timestamps {
                let times: Vec<DateTime<Utc>> = idx.iter().map(|&i| ts[i]).collect();
                stats.trend = Some(fit_salary_trend(&values, &times));
            }
            (label.clone(), stats)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_percentiles_match_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&sorted, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile(&sorted, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&sorted, 75.0) - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_describe_basic_group() {
        let stats = describe(&[40_000.0, 60_000.0, 50_000.0]);
        assert_eq!(stats.count, 3);
        assert!((stats.mean_salary - 50_000.0).abs() < 1e-9);
        assert!((stats.median_salary - 50_000.0).abs() < 1e-9);
        assert!((stats.std_salary - (200_000_000.0_f64 / 3.0).sqrt()).abs() < 1e-6);
        assert!(stats.trend.is_none());
    }

    #[test]
    fn test_quartiles_are_ordered() {
        let groups = labels(&["a", "a", "b", "c", "c", "c", "c"]);
        let salaries = [10.0, 5.0, 7.0, 3.0, 9.0, 1.0, 4.0];
        let stats = compute_group_statistics(&salaries, &groups, None).unwrap();
        for s in stats.values() {
            assert!(s.quartiles[0] <= s.quartiles[1]);
            assert!(s.quartiles[1] <= s.quartiles[2]);
        }
        assert_eq!(stats["b"].quartiles, [7.0, 7.0, 7.0]);
    }

    #[test]
    fn test_identical_salaries_have_zero_std() {
        let groups = labels(&["x", "x", "x"]);
        let stats = compute_group_statistics(&[55_000.0; 3], &groups, None).unwrap();
        assert_eq!(stats["x"].std_salary, 0.0);
    }

    #[test]
    fn test_missing_timestamps_leave_trend_absent() {
        let groups = labels(&["a", "b"]);
        let stats = compute_group_statistics(&[1.0, 2.0], &groups, None).unwrap();
        assert!(stats.values().all(|s| s.trend.is_none()));
        let json = serde_json::to_value(&stats["a"]).unwrap();
        assert!(json.get("trend").is_none());
    }

    #[test]
    fn test_timestamps_attach_trend() {
        let groups = labels(&["a", "a"]);
        let t0 = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let ts = [t0, t0 + chrono::Duration::days(100)];
        let stats = compute_group_statistics(&[50_000.0, 51_000.0], &groups, Some(&ts)).unwrap();
        let trend = stats["a"].trend.as_ref().unwrap();
        assert!((trend.slope - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = compute_group_statistics(&[1.0, 2.0], &labels(&["a"]), None).unwrap_err();
        assert_eq!(
            err,
            FairnessError::LengthMismatch {
                field: "groups".to_string(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = compute_group_statistics(&[], &[], None).unwrap_err();
        assert_eq!(err, FairnessError::EmptyInput);
    }

    #[test]
    fn test_partition_tracks_first_encounter_order() {
        let partition = Partition::new(&labels(&["z", "a", "z", "m"]));
        assert_eq!(partition.order, labels(&["z", "a", "m"]));
        assert_eq!(partition.members["z"], vec![0, 2]);
    }
}
