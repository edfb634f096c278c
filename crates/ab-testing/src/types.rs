use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adperf_core::AnalysisError;

/// Lifecycle state of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Draft,
    Running,
    Paused,
    Completed,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Draft => "draft",
            TestStatus::Running => "running",
            TestStatus::Paused => "paused",
            TestStatus::Completed => "completed",
        }
    }
}

/// Variant slot within a test. Up to four creatives can be compared;
/// the significance test runs between slots `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKey {
    A,
    B,
    C,
    D,
}

impl VariantKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKey::A => "a",
            VariantKey::B => "b",
            VariantKey::C => "c",
            VariantKey::D => "d",
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric an experiment is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Ctr,
    Cvr,
    Cpa,
    Roas,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Ctr => "ctr",
            Metric::Cvr => "cvr",
            Metric::Cpa => "cpa",
            Metric::Roas => "roas",
        }
    }

    /// CTR and CVR are binomial rates, so they admit a proportion z-test.
    /// CPA and ROAS are reported descriptively only.
    pub fn is_proportion(&self) -> bool {
        matches!(self, Metric::Ctr | Metric::Cvr)
    }
}

impl FromStr for Metric {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ctr" => Ok(Metric::Ctr),
            "cvr" => Ok(Metric::Cvr),
            "cpa" => Ok(Metric::Cpa),
            "roas" => Ok(Metric::Roas),
            other => Err(AnalysisError::UnknownMetric(other.to_string())),
        }
    }
}

/// Computed stats for one variant of an analyzed test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantStats {
    pub creative_id: String,
    pub metric_value: f64,
    pub sample_size: u64,
    pub std_error: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: f64,
    pub spend: f64,
    pub revenue: f64,
}

/// An A/B test entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ABTest {
    pub test_id: String,
    pub client_id: String,
    pub platform: String,
    pub test_name: String,
    pub test_type: String,
    pub status: TestStatus,
    pub variant_a_id: String,
    pub variant_b_id: String,
    #[serde(default)]
    pub variant_c_id: Option<String>,
    #[serde(default)]
    pub variant_d_id: Option<String>,
    pub traffic_split: BTreeMap<VariantKey, f64>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub winner: Option<VariantKey>,
    pub confidence_level: f64,
    pub metrics: BTreeMap<VariantKey, VariantStats>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ABTest {
    /// Registered variant slots in order, with their creative ids.
    pub fn variants(&self) -> Vec<(VariantKey, String)> {
        let mut variants = vec![
            (VariantKey::A, self.variant_a_id.clone()),
            (VariantKey::B, self.variant_b_id.clone()),
        ];
        if let Some(id) = &self.variant_c_id {
            variants.push((VariantKey::C, id.clone()));
        }
        if let Some(id) = &self.variant_d_id {
            variants.push((VariantKey::D, id.clone()));
        }
        variants
    }
}

/// Caller-supplied definition for a new test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    pub client_id: String,
    pub platform: String,
    pub test_name: String,
    pub test_type: String,
    pub variant_a_id: String,
    pub variant_b_id: String,
    #[serde(default)]
    pub variant_c_id: Option<String>,
    #[serde(default)]
    pub variant_d_id: Option<String>,
    /// When omitted, traffic is split evenly across the registered slots.
    #[serde(default)]
    pub traffic_split: Option<BTreeMap<VariantKey, f64>>,
}

/// Result of analyzing a test against performance data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAnalysis {
    pub test_id: String,
    pub metric: Metric,
    pub variants: BTreeMap<VariantKey, VariantStats>,
    pub winner: Option<VariantKey>,
    pub p_value: f64,
    pub confidence_level: f64,
    pub is_significant: bool,
}

/// Read-only projection of stored test state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub test_id: String,
    pub test_name: String,
    pub platform: String,
    pub status: TestStatus,
    pub winner: Option<VariantKey>,
    pub confidence_level: f64,
    pub metrics: BTreeMap<VariantKey, VariantStats>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parsing() {
        assert_eq!("ctr".parse::<Metric>().unwrap(), Metric::Ctr);
        assert_eq!("ROAS".parse::<Metric>().unwrap(), Metric::Roas);
        assert!("clickiness".parse::<Metric>().is_err());
    }

    #[test]
    fn test_proportion_metrics() {
        assert!(Metric::Ctr.is_proportion());
        assert!(Metric::Cvr.is_proportion());
        assert!(!Metric::Cpa.is_proportion());
        assert!(!Metric::Roas.is_proportion());
    }
}
