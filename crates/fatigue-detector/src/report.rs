//! Fatigue report types and status classification.

use serde::{Deserialize, Serialize};

use crate::config::{DriverThresholds, FatigueConfig};

/// Fatigue classification for a creative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatigueStatus {
    /// Performing normally (or too little recent volume to judge).
    #[serde(rename = "fresh")]
    Fresh,
    /// Early degradation detected, worth watching.
    #[serde(rename = "fatigue-risk")]
    FatigueRisk,
    /// Sustained degradation, corrective action recommended.
    #[serde(rename = "fatigued")]
    Fatigued,
}

impl FatigueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueStatus::Fresh => "fresh",
            FatigueStatus::FatigueRisk => "fatigue-risk",
            FatigueStatus::Fatigued => "fatigued",
        }
    }

    /// Classify from a composite score. The recent-volume floor takes
    /// priority over any score.
    pub fn classify(score: f64, recent_impressions: u64, config: &FatigueConfig) -> Self {
        if recent_impressions < config.min_recent_impressions {
            FatigueStatus::Fresh
        } else if score >= config.fatigue_threshold {
            FatigueStatus::Fatigued
        } else if score >= config.risk_threshold {
            FatigueStatus::FatigueRisk
        } else {
            FatigueStatus::Fresh
        }
    }
}

/// Relative degradation of the recent window against the baseline window.
/// Drops and increases are clamped at 0 so improvements never go negative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DegradationMetrics {
    pub ctr_drop: f64,
    pub cvr_drop: f64,
    pub roas_drop: f64,
    pub cpa_increase: f64,
    pub cpc_increase: f64,
}

impl DegradationMetrics {
    /// List the drivers that exceed their note thresholds, or
    /// "Performance stable" when none do.
    pub fn summarize_drivers(&self, thresholds: &DriverThresholds) -> String {
        let mut drivers = Vec::new();
        if self.ctr_drop >= thresholds.ctr_drop {
            drivers.push("CTR down");
        }
        if self.cvr_drop >= thresholds.cvr_drop {
            drivers.push("CVR down");
        }
        if self.roas_drop >= thresholds.roas_drop {
            drivers.push("ROAS down");
        }
        if self.cpa_increase >= thresholds.cpa_increase {
            drivers.push("CPA up");
        }
        if self.cpc_increase >= thresholds.cpc_increase {
            drivers.push("CPC up");
        }
        if drivers.is_empty() {
            "Performance stable".to_string()
        } else {
            drivers.join(", ")
        }
    }
}

/// Per-creative fatigue classification with supporting metrics.
///
/// Rates reported for display are percentage-scaled (x100, 2 decimals);
/// drop/increase ratios and the fatigue score are 3-decimal fractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatigueReport {
    pub creative_id: String,
    pub status: FatigueStatus,
    pub fatigue_score: f64,

    // All-time totals
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub conversions: f64,
    pub spend: f64,
    pub revenue: f64,

    // Degradation drivers
    pub ctr_drop: f64,
    pub cvr_drop: f64,
    pub roas_drop: f64,
    pub cpa_increase: f64,
    pub cpc_increase: f64,
    pub notes: String,

    // Windowed metrics (trailing recent / baseline windows)
    pub impressions_7d: u64,
    pub ctr_7d: f64,
    pub ctr_30d: f64,
    pub cvr_7d: f64,
    pub cvr_30d: f64,
    pub roas_7d: f64,
    pub roas_30d: f64,
    pub cpa_7d: f64,
    pub cpa_30d: f64,
    pub cpc_7d: f64,
    pub cpc_30d: f64,

    #[serde(default)]
    pub campaign_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_priority_order() {
        let config = FatigueConfig::default();

        // Volume floor wins regardless of score
        assert_eq!(
            FatigueStatus::classify(0.9, 499, &config),
            FatigueStatus::Fresh
        );
        assert_eq!(
            FatigueStatus::classify(0.9, 500, &config),
            FatigueStatus::Fatigued
        );
        assert_eq!(
            FatigueStatus::classify(0.5, 1000, &config),
            FatigueStatus::Fatigued
        );
        assert_eq!(
            FatigueStatus::classify(0.3, 1000, &config),
            FatigueStatus::FatigueRisk
        );
        assert_eq!(
            FatigueStatus::classify(0.29, 1000, &config),
            FatigueStatus::Fresh
        );
    }

    #[test]
    fn test_driver_notes() {
        let thresholds = DriverThresholds::default();

        let stable = DegradationMetrics::default();
        assert_eq!(stable.summarize_drivers(&thresholds), "Performance stable");

        let degraded = DegradationMetrics {
            ctr_drop: 0.30,
            cvr_drop: 0.05,
            roas_drop: 0.25,
            cpa_increase: 0.0,
            cpc_increase: 0.21,
        };
        assert_eq!(
            degraded.summarize_drivers(&thresholds),
            "CTR down, ROAS down, CPC up"
        );
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&FatigueStatus::FatigueRisk).unwrap();
        assert_eq!(json, "\"fatigue-risk\"");
    }
}
