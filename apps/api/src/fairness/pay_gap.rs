use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fairness::group_stats::{
    statistics_for, validate_observations, GroupStatistics, Partition,
};
use crate::fairness::significance::{compute_statistical_significance, SignificanceResult};
use crate::fairness::FairnessError;

/// One group's median gap relative to the reference group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupGap {
    /// `(reference median - group median) / reference median * 100`.
    /// `None` when the reference median is zero and the ratio is undefined.
    pub gap_percentage: Option<f64>,
    pub statistical_significance: SignificanceResult,
    pub reference_group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayGapAnalysis {
    pub group_stats: BTreeMap<String, GroupStatistics>,
    pub gaps: BTreeMap<String, GroupGap>,
    pub reference_group: String,
}

impl PayGapAnalysis {
    /// Defined gap percentages, in group-label order.
    pub fn defined_gaps(&self) -> impl Iterator<Item = f64> + '_ {
        self.gaps.values().filter_map(|g| g.gap_percentage)
    }

    /// Largest signed gap; 0 when no gap is defined.
    pub fn largest_gap(&self) -> f64 {
        self.defined_gaps().fold(None, |acc: Option<f64>, g| {
            Some(acc.map_or(g, |a| a.max(g)))
        })
        .unwrap_or(0.0)
    }

    pub fn largest_abs_gap(&self) -> f64 {
        self.defined_gaps().map(f64::abs).fold(0.0, f64::max)
    }

    pub fn any_significant(&self) -> bool {
        self.gaps
            .values()
            .any(|g| g.statistical_significance.significant)
    }
}

/// Picks the group with the most observations. Ties go to the label seen
/// first in the input.
fn select_reference(partition: &Partition) -> Option<&str> {
    let mut best: Option<(&str, usize)> = None;
    for label in &partition.order {
        let count = partition.members.get(label).map_or(0, Vec::len);
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label.as_str(), count));
        }
    }
    best.map(|(label, _)| label)
}

/// Median pay gaps of every group against the largest group, each backed by
/// a two-sample significance test on the raw salaries.
pub fn compute_pay_gap(
    salaries: &[f64],
    groups: &[String],
    timestamps: Option<&[DateTime<Utc>]>,
) -> Result<PayGapAnalysis, FairnessError> {
    validate_observations(salaries, groups, timestamps)?;

    let partition = Partition::new(groups);
    let group_stats = statistics_for(&partition, salaries, timestamps);
    let reference_group = select_reference(&partition)
        .ok_or(FairnessError::EmptyInput)?
        .to_string();

    debug!(
        groups = group_stats.len(),
        reference = %reference_group,
        "computing pay gaps"
    );

    let mut gaps = BTreeMap::new();
    if group_stats.len() >= 2 {
        let reference_median = group_stats[&reference_group].median_salary;
        let reference_salaries = partition.values(&reference_group, salaries);

        for (label, stats) in &group_stats {
            if *label == reference_group {
                continue;
            }
            let gap_percentage = if reference_median == 0.0 {
                None
            } else {
                Some((reference_median - stats.median_salary) / reference_median * 100.0)
            };
            let group_salaries = partition.values(label, salaries);
            let statistical_significance =
                compute_statistical_significance(&reference_salaries, &group_salaries)?;

            gaps.insert(
                label.clone(),
                GroupGap {
                    gap_percentage,
                    statistical_significance,
                    reference_group: reference_group.clone(),
                },
            );
        }
    }

    Ok(PayGapAnalysis {
        group_stats,
        gaps,
        reference_group,
    })
}
