use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fairness::group_stats::{median, validate_observations, Partition};
use crate::fairness::FairnessError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemographicSummary {
    /// Share of observations carrying each label; shares sum to 1.
    pub distribution: BTreeMap<String, f64>,
    pub overall_median: f64,
    /// Fractional gap of each group median below the overall median.
    /// `None` when the overall median is zero.
    pub gaps_vs_overall_median: BTreeMap<String, Option<f64>>,
}

pub fn attribute_distribution(labels: &[String]) -> BTreeMap<String, f64> {
    let total = labels.len() as f64;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.clone()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(label, count)| (label, count as f64 / total))
        .collect()
}

pub fn summarize_demographics(
    salaries: &[f64],
    groups: &[String],
) -> Result<DemographicSummary, FairnessError> {
    validate_observations(salaries, groups, None)?;

    let overall_median = median(salaries);
    let partition = Partition::new(groups);
    let gaps_vs_overall_median = partition
        .members
        .keys()
        .map(|label| {
            let group_median = median(&partition.values(label, salaries));
            let gap = if overall_median == 0.0 {
                None
            } else {
                Some((overall_median - group_median) / overall_median)
            };
            (label.clone(), gap)
        })
        .collect();

    Ok(DemographicSummary {
        distribution: attribute_distribution(groups),
        overall_median,
        gaps_vs_overall_median,
    })
}
