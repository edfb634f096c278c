//! Tunable policy constants for fatigue classification.

use serde::{Deserialize, Serialize};

use crate::report::DegradationMetrics;

/// Weights applied to each degradation component when composing the
/// fatigue score. Defaults sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FatigueWeights {
    pub ctr_drop: f64,
    pub cvr_drop: f64,
    pub roas_drop: f64,
    pub cpa_increase: f64,
    pub cpc_increase: f64,
}

impl Default for FatigueWeights {
    fn default() -> Self {
        Self {
            ctr_drop: 0.35,
            cvr_drop: 0.25,
            roas_drop: 0.25,
            cpa_increase: 0.10,
            cpc_increase: 0.05,
        }
    }
}

impl FatigueWeights {
    /// Composite fatigue score: weighted sum of the degradation components.
    pub fn score(&self, metrics: &DegradationMetrics) -> f64 {
        self.ctr_drop * metrics.ctr_drop
            + self.cvr_drop * metrics.cvr_drop
            + self.roas_drop * metrics.roas_drop
            + self.cpa_increase * metrics.cpa_increase
            + self.cpc_increase * metrics.cpc_increase
    }
}

/// Per-driver thresholds used only for the human-readable notes field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverThresholds {
    pub ctr_drop: f64,
    pub cvr_drop: f64,
    pub roas_drop: f64,
    pub cpa_increase: f64,
    pub cpc_increase: f64,
}

impl Default for DriverThresholds {
    fn default() -> Self {
        Self {
            ctr_drop: 0.25,
            cvr_drop: 0.20,
            roas_drop: 0.20,
            cpa_increase: 0.20,
            cpc_increase: 0.20,
        }
    }
}

/// Full classifier configuration.
///
/// Serde-deserializable so deployments can override individual constants
/// from a config file; defaults match production policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FatigueConfig {
    /// Trailing window (days, inclusive of the latest date) treated as
    /// "recent" performance.
    pub recent_window_days: i64,
    /// Trailing window (days) treated as the baseline to degrade against.
    pub baseline_window_days: i64,
    /// Below this many recent impressions a creative is always `fresh`.
    pub min_recent_impressions: u64,
    /// Fatigue score at or above which a creative is `fatigued`.
    pub fatigue_threshold: f64,
    /// Fatigue score at or above which a creative is `fatigue-risk`.
    pub risk_threshold: f64,
    pub weights: FatigueWeights,
    pub driver_thresholds: DriverThresholds,
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            recent_window_days: 7,
            baseline_window_days: 30,
            min_recent_impressions: 500,
            fatigue_threshold: 0.5,
            risk_threshold: 0.3,
            weights: FatigueWeights::default(),
            driver_thresholds: DriverThresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = FatigueWeights::default();
        let sum = w.ctr_drop + w.cvr_drop + w.roas_drop + w.cpa_increase + w.cpc_increase;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_monotone_in_each_component() {
        let weights = FatigueWeights::default();
        let base = DegradationMetrics {
            ctr_drop: 0.1,
            cvr_drop: 0.1,
            roas_drop: 0.1,
            cpa_increase: 0.1,
            cpc_increase: 0.1,
        };
        let base_score = weights.score(&base);

        for bump in [
            DegradationMetrics { ctr_drop: 0.2, ..base },
            DegradationMetrics { cvr_drop: 0.2, ..base },
            DegradationMetrics { roas_drop: 0.2, ..base },
            DegradationMetrics { cpa_increase: 0.2, ..base },
            DegradationMetrics { cpc_increase: 0.2, ..base },
        ] {
            assert!(weights.score(&bump) > base_score);
        }
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let cfg: FatigueConfig = serde_json::from_str(r#"{"fatigue_threshold": 0.6}"#).unwrap();
        assert_eq!(cfg.fatigue_threshold, 0.6);
        assert_eq!(cfg.recent_window_days, 7);
        assert_eq!(cfg.min_recent_impressions, 500);
    }
}
