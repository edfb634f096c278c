use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of delivery stats for a single creative on one platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub creative_id: String,
    pub date: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: f64,
    pub conversions: f64,
    pub revenue: f64,
    pub platform: String,
    #[serde(default)]
    pub campaign_name: Option<String>,
}

/// Summed delivery counters over some set of performance rows.
///
/// Derived rates all treat a zero denominator as 0.0 so early-lifecycle
/// creatives (no spend, no clicks yet) never produce NaN or Inf.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricTotals {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: f64,
    pub spend: f64,
    pub revenue: f64,
}

impl MetricTotals {
    /// Accumulate one performance row.
    pub fn add(&mut self, record: &PerformanceRecord) {
        self.impressions += record.impressions;
        self.clicks += record.clicks;
        self.conversions += record.conversions;
        self.spend += record.spend;
        self.revenue += record.revenue;
    }

    /// Click-through rate: clicks / impressions.
    pub fn ctr(&self) -> f64 {
        safe_div(self.clicks as f64, self.impressions as f64)
    }

    /// Conversion rate: conversions / clicks.
    pub fn cvr(&self) -> f64 {
        safe_div(self.conversions, self.clicks as f64)
    }

    /// Return on ad spend: revenue / spend.
    pub fn roas(&self) -> f64 {
        safe_div(self.revenue, self.spend)
    }

    /// Cost per acquisition: spend / conversions.
    pub fn cpa(&self) -> f64 {
        safe_div(self.spend, self.conversions)
    }

    /// Cost per click: spend / clicks.
    pub fn cpc(&self) -> f64 {
        safe_div(self.spend, self.clicks as f64)
    }
}

/// Division that degrades to 0.0 instead of NaN/Inf on a non-positive
/// denominator.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
