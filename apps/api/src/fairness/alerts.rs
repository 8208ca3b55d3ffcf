use serde::{Deserialize, Serialize};

use crate::fairness::bias::BiasMetrics;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlertThresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            warning: 0.1,
            critical: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricAlert {
    pub severity: AlertSeverity,
    pub metric: String,
    pub value: f64,
    pub message: String,
}

impl AlertThresholds {
    /// Classifies `|value|`; strictly above a threshold triggers it.
    pub fn check(&self, metric: &str, value: f64) -> Option<MetricAlert> {
        let severity = if value.abs() > self.critical {
            AlertSeverity::Critical
        } else if value.abs() > self.warning {
            AlertSeverity::Warning
        } else {
            return None;
        };
        let label = match severity {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        };
        Some(MetricAlert {
            severity,
            metric: metric.to_string(),
            value,
            message: format!("Metric {metric} exceeded {label} threshold"),
        })
    }
}

/// Alerts for every attribute's demographic parity and equalized odds.
pub fn bias_alerts(bias: &BiasMetrics, thresholds: &AlertThresholds) -> Vec<MetricAlert> {
    bias.iter()
        .flat_map(|(attr, m)| {
            [
                thresholds.check(
                    &format!("{attr}.demographic_parity"),
                    m.overall.demographic_parity,
                ),
                thresholds.check(&format!("{attr}.equalized_odds"), m.overall.equalized_odds),
            ]
        })
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_classify_severity() {
        let t = AlertThresholds::default();
        assert!(t.check("dp", 0.1).is_none());
        assert_eq!(t.check("dp", 0.15).unwrap().severity, AlertSeverity::Warning);
        let critical = t.check("dp", -0.25).unwrap();
        assert_eq!(critical.severity, AlertSeverity::Critical);
        assert_eq!(critical.message, "Metric dp exceeded critical threshold");
    }
}
