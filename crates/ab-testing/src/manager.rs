//! Experiment lifecycle management and analysis.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use adperf_core::{AnalysisError, MetricTotals, PerformanceRecord};

use crate::stats::two_proportion_z_test;
use crate::store::TestStore;
use crate::types::{
    ABTest, Metric, TestAnalysis, TestDefinition, TestStatus, TestSummary, VariantKey,
    VariantStats,
};

const SPLIT_TOLERANCE: f64 = 1e-6;

/// Manages A/B tests through an injected store.
///
/// Single-writer by contract: callers are expected to serialize access per
/// test_id. `analyze_test` reads, recomputes and writes back the entity as
/// one step; swapping in a transactional store keeps the analysis logic
/// unchanged.
pub struct ABTestManager<S: TestStore> {
    store: S,
}

impl<S: TestStore> ABTestManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Register a new test in `draft` status.
    ///
    /// A missing traffic split defaults to an even 1/N split across the
    /// registered variant slots; a supplied split must cover exactly those
    /// slots and sum to 1.0.
    pub fn create_test(&mut self, definition: TestDefinition) -> Result<ABTest> {
        let test_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let slots: Vec<VariantKey> = {
            let mut slots = vec![VariantKey::A, VariantKey::B];
            if definition.variant_c_id.is_some() {
                slots.push(VariantKey::C);
            }
            if definition.variant_d_id.is_some() {
                slots.push(VariantKey::D);
            }
            slots
        };

        let traffic_split = match definition.traffic_split {
            Some(split) => {
                validate_split(&split, &slots)?;
                split
            }
            None => {
                let share = 1.0 / slots.len() as f64;
                slots.iter().map(|slot| (*slot, share)).collect()
            }
        };

        let test = ABTest {
            test_id: test_id.clone(),
            client_id: definition.client_id,
            platform: definition.platform,
            test_name: definition.test_name,
            test_type: definition.test_type,
            status: TestStatus::Draft,
            variant_a_id: definition.variant_a_id,
            variant_b_id: definition.variant_b_id,
            variant_c_id: definition.variant_c_id,
            variant_d_id: definition.variant_d_id,
            traffic_split,
            start_date: None,
            end_date: None,
            winner: None,
            confidence_level: 0.0,
            metrics: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };

        self.store.upsert(test.clone());
        info!(test_id = %test_id, test_name = %test.test_name, "created A/B test");
        Ok(test)
    }

    /// Transition a test to `running`. Returns false for unknown ids.
    pub fn start_test(&mut self, test_id: &str) -> bool {
        let Some(mut test) = self.store.get(test_id) else {
            warn!(%test_id, "test not found");
            return false;
        };

        test.status = TestStatus::Running;
        test.start_date = Some(Utc::now());
        test.updated_at = Utc::now();
        self.store.upsert(test);

        info!(%test_id, "started A/B test");
        true
    }

    /// Transition a test to `paused`. Returns false for unknown ids.
    pub fn pause_test(&mut self, test_id: &str) -> bool {
        let Some(mut test) = self.store.get(test_id) else {
            warn!(%test_id, "test not found");
            return false;
        };

        test.status = TestStatus::Paused;
        test.updated_at = Utc::now();
        self.store.upsert(test);

        info!(%test_id, "paused A/B test");
        true
    }

    /// Transition a test to `completed`, optionally recording a winner.
    pub fn complete_test(&mut self, test_id: &str, winner: Option<VariantKey>) -> bool {
        let Some(mut test) = self.store.get(test_id) else {
            warn!(%test_id, "test not found");
            return false;
        };

        test.status = TestStatus::Completed;
        test.end_date = Some(Utc::now());
        test.winner = winner;
        test.updated_at = Utc::now();
        self.store.upsert(test);

        info!(%test_id, winner = ?winner, "completed A/B test");
        true
    }

    /// Compute per-variant stats for `metric` and, for proportion metrics,
    /// a pooled two-proportion z-test between slots `a` and `b`.
    ///
    /// The computed metrics, winner and confidence level are written back to
    /// the stored test. Unknown test ids yield `None`; sparse data (empty
    /// variants, degenerate proportions) degrades to p = 1.0, never an error.
    pub fn analyze_test(
        &mut self,
        test_id: &str,
        performance_data: &[PerformanceRecord],
        metric: Metric,
        confidence_level: f64,
    ) -> Option<TestAnalysis> {
        let Some(mut test) = self.store.get(test_id) else {
            warn!(%test_id, "test not found");
            return None;
        };

        let variants: BTreeMap<VariantKey, VariantStats> = test
            .variants()
            .into_iter()
            .map(|(slot, creative_id)| {
                (slot, variant_stats(&creative_id, performance_data, metric))
            })
            .collect();

        let mut p_value = 1.0;
        let mut winner = None;

        if metric.is_proportion() {
            if let (Some(a), Some(b)) = (variants.get(&VariantKey::A), variants.get(&VariantKey::B))
            {
                if let Some(comparison) = two_proportion_z_test(
                    a.metric_value,
                    a.sample_size,
                    b.metric_value,
                    b.sample_size,
                ) {
                    p_value = comparison.p_value;
                    if p_value < 1.0 - confidence_level {
                        winner = Some(if a.metric_value > b.metric_value {
                            VariantKey::A
                        } else {
                            VariantKey::B
                        });
                    }
                }
            }
        }

        test.metrics = variants.clone();
        test.confidence_level = if p_value < 1.0 { 1.0 - p_value } else { 0.0 };
        test.winner = winner;
        test.updated_at = Utc::now();
        let stored_confidence = test.confidence_level;
        self.store.upsert(test);

        info!(
            %test_id,
            metric = metric.as_str(),
            winner = ?winner,
            p_value,
            "analyzed A/B test"
        );

        Some(TestAnalysis {
            test_id: test_id.to_string(),
            metric,
            variants,
            winner,
            p_value,
            confidence_level: stored_confidence,
            is_significant: p_value < 1.0 - confidence_level,
        })
    }

    /// Fetch a test by id.
    pub fn get_test(&self, test_id: &str) -> Option<ABTest> {
        self.store.get(test_id)
    }

    /// List tests, optionally filtered by client and/or status.
    pub fn list_tests(&self, client_id: Option<&str>, status: Option<TestStatus>) -> Vec<ABTest> {
        self.store
            .list()
            .into_iter()
            .filter(|t| client_id.map_or(true, |c| t.client_id == c))
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect()
    }

    /// Read-only projection of stored test state.
    pub fn get_test_summary(&self, test_id: &str) -> Option<TestSummary> {
        let test = self.store.get(test_id)?;
        Some(TestSummary {
            test_id: test.test_id,
            test_name: test.test_name,
            platform: test.platform,
            status: test.status,
            winner: test.winner,
            confidence_level: test.confidence_level,
            metrics: test.metrics,
            start_date: test.start_date,
            end_date: test.end_date,
        })
    }
}

fn validate_split(split: &BTreeMap<VariantKey, f64>, slots: &[VariantKey]) -> Result<()> {
    if split.len() != slots.len() || !slots.iter().all(|slot| split.contains_key(slot)) {
        return Err(AnalysisError::InvalidInput(
            "traffic split must cover exactly the registered variant slots".to_string(),
        )
        .into());
    }

    if split.values().any(|share| *share <= 0.0) {
        return Err(
            AnalysisError::InvalidInput("traffic split shares must be positive".to_string()).into(),
        );
    }

    let total: f64 = split.values().sum();
    if (total - 1.0).abs() > SPLIT_TOLERANCE {
        return Err(AnalysisError::InvalidInput(format!(
            "traffic split must sum to 1.0, got {total}"
        ))
        .into());
    }

    Ok(())
}

/// Aggregate one variant's rows and derive the requested metric.
///
/// Sample sizes: impressions for CTR, clicks for CVR, conversions for CPA,
/// and whole dollars of spend for ROAS (a descriptive proxy only; ROAS and
/// CPA never enter the significance test).
fn variant_stats(creative_id: &str, data: &[PerformanceRecord], metric: Metric) -> VariantStats {
    let mut totals = MetricTotals::default();
    for row in data.iter().filter(|r| r.creative_id == creative_id) {
        totals.add(row);
    }

    let (metric_value, sample_size) = match metric {
        Metric::Ctr => (totals.ctr(), totals.impressions),
        Metric::Cvr => (totals.cvr(), totals.clicks),
        Metric::Cpa => (totals.cpa(), totals.conversions as u64),
        Metric::Roas => (totals.roas(), totals.spend.trunc() as u64),
    };

    let std_error = if metric.is_proportion() && sample_size > 0 {
        ((metric_value * (1.0 - metric_value)) / sample_size as f64).sqrt()
    } else {
        0.0
    };

    VariantStats {
        creative_id: creative_id.to_string(),
        metric_value,
        sample_size,
        std_error,
        impressions: totals.impressions,
        clicks: totals.clicks,
        conversions: totals.conversions,
        spend: totals.spend,
        revenue: totals.revenue,
    }
}
