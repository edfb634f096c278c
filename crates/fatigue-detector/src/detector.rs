//! Windowed aggregation and fatigue classification.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use adperf_core::{MetricTotals, PerformanceRecord};

use crate::config::FatigueConfig;
use crate::report::{DegradationMetrics, FatigueReport, FatigueStatus};

/// Classifies creatives by degradation of a trailing recent window against
/// a trailing baseline window. Stateless per call; the windows are anchored
/// at the latest date present in the input.
pub struct FatigueDetector {
    config: FatigueConfig,
}

impl Default for FatigueDetector {
    fn default() -> Self {
        Self::new(FatigueConfig::default())
    }
}

impl FatigueDetector {
    pub fn new(config: FatigueConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FatigueConfig {
        &self.config
    }

    /// Produce one report per distinct creative_id, sorted by creative_id.
    /// Empty input yields an empty vec.
    pub fn detect(&self, records: &[PerformanceRecord]) -> Vec<FatigueReport> {
        let Some(max_date) = records.iter().map(|r| r.date).max() else {
            return Vec::new();
        };

        let cfg = &self.config;
        let recent_cutoff = max_date - Duration::days(cfg.recent_window_days - 1);
        let baseline_cutoff = max_date - Duration::days(cfg.baseline_window_days - 1);

        let totals = aggregate_by_creative(records.iter());
        let recent = aggregate_by_creative(records.iter().filter(|r| r.date >= recent_cutoff));
        let mut baseline =
            aggregate_by_creative(records.iter().filter(|r| r.date >= baseline_cutoff));
        // Not enough history for a baseline window: use everything we have.
        if baseline.is_empty() {
            baseline = totals.clone();
        }

        let campaigns = first_campaign_names(records);

        let reports: Vec<FatigueReport> = totals
            .iter()
            .map(|(creative_id, all_time)| {
                let recent_totals = recent.get(creative_id).copied().unwrap_or_default();
                let baseline_totals = baseline.get(creative_id).copied().unwrap_or_default();

                self.build_report(
                    creative_id,
                    *all_time,
                    recent_totals,
                    baseline_totals,
                    campaigns.get(creative_id).cloned(),
                )
            })
            .collect();

        debug!(
            creatives = reports.len(),
            %max_date,
            "classified creative fatigue"
        );

        reports
    }

    fn build_report(
        &self,
        creative_id: &str,
        all_time: MetricTotals,
        recent: MetricTotals,
        baseline: MetricTotals,
        campaign_name: Option<String>,
    ) -> FatigueReport {
        let cfg = &self.config;

        let degradation = DegradationMetrics {
            ctr_drop: relative_drop(recent.ctr(), baseline.ctr()),
            cvr_drop: relative_drop(recent.cvr(), baseline.cvr()),
            roas_drop: relative_drop(recent.roas(), baseline.roas()),
            cpa_increase: relative_increase(recent.cpa(), baseline.cpa()),
            cpc_increase: relative_increase(recent.cpc(), baseline.cpc()),
        };
        let score = cfg.weights.score(&degradation);

        let status = FatigueStatus::classify(score, recent.impressions, cfg);
        let notes = if recent.impressions < cfg.min_recent_impressions {
            format!(
                "Insufficient recent volume (<{} impressions)",
                cfg.min_recent_impressions
            )
        } else {
            degradation.summarize_drivers(&cfg.driver_thresholds)
        };

        FatigueReport {
            creative_id: creative_id.to_string(),
            status,
            fatigue_score: round3(score),

            impressions: all_time.impressions,
            clicks: all_time.clicks,
            ctr: round2(all_time.ctr() * 100.0),
            conversions: all_time.conversions,
            spend: all_time.spend,
            revenue: all_time.revenue,

            ctr_drop: round3(degradation.ctr_drop),
            cvr_drop: round3(degradation.cvr_drop),
            roas_drop: round3(degradation.roas_drop),
            cpa_increase: round3(degradation.cpa_increase),
            cpc_increase: round3(degradation.cpc_increase),
            notes,

            impressions_7d: recent.impressions,
            ctr_7d: round2(recent.ctr() * 100.0),
            ctr_30d: round2(baseline.ctr() * 100.0),
            cvr_7d: round2(recent.cvr() * 100.0),
            cvr_30d: round2(baseline.cvr() * 100.0),
            roas_7d: recent.roas(),
            roas_30d: baseline.roas(),
            cpa_7d: recent.cpa(),
            cpa_30d: baseline.cpa(),
            cpc_7d: recent.cpc(),
            cpc_30d: baseline.cpc(),

            campaign_name,
        }
    }
}

/// Relative decline of `recent` vs `baseline`, clamped at 0.
fn relative_drop(recent: f64, baseline: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    ((baseline - recent) / baseline).max(0.0)
}

/// Relative increase of `recent` vs `baseline`, clamped at 0.
fn relative_increase(recent: f64, baseline: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    ((recent - baseline) / baseline).max(0.0)
}

fn aggregate_by_creative<'a>(
    records: impl Iterator<Item = &'a PerformanceRecord>,
) -> BTreeMap<String, MetricTotals> {
    let mut groups: BTreeMap<String, MetricTotals> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.creative_id.clone())
            .or_default()
            .add(record);
    }
    groups
}

/// First non-null campaign name per creative, in date order.
fn first_campaign_names(records: &[PerformanceRecord]) -> BTreeMap<String, String> {
    let mut firsts: BTreeMap<String, (NaiveDate, String)> = BTreeMap::new();
    for record in records {
        let Some(name) = &record.campaign_name else {
            continue;
        };
        match firsts.get(&record.creative_id) {
            Some((date, _)) if *date <= record.date => {}
            _ => {
                firsts.insert(record.creative_id.clone(), (record.date, name.clone()));
            }
        }
    }
    firsts
        .into_iter()
        .map(|(creative_id, (_, name))| (creative_id, name))
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap() - Duration::days(offset)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        creative_id: &str,
        date: NaiveDate,
        impressions: u64,
        clicks: u64,
        conversions: f64,
        spend: f64,
        revenue: f64,
        campaign_name: Option<&str>,
    ) -> PerformanceRecord {
        PerformanceRecord {
            creative_id: creative_id.to_string(),
            date,
            impressions,
            clicks,
            spend,
            conversions,
            revenue,
            platform: "meta".to_string(),
            campaign_name: campaign_name.map(|s| s.to_string()),
        }
    }

    /// 30 days of history: 22 healthy days then 8 degraded days. Clicks,
    /// conversions and revenue all collapse while spend stays constant.
    fn degrading_creative() -> Vec<PerformanceRecord> {
        let mut rows = Vec::new();
        for offset in (8..30).rev() {
            rows.push(record("C1", day(offset), 1000, 50, 5.0, 50.0, 250.0, None));
        }
        for offset in (0..8).rev() {
            rows.push(record("C1", day(offset), 1000, 15, 1.5, 50.0, 75.0, None));
        }
        rows
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let detector = FatigueDetector::default();
        assert!(detector.detect(&[]).is_empty());
    }

    #[test]
    fn test_one_report_per_creative_sorted() {
        let detector = FatigueDetector::default();
        let rows = vec![
            record("B", day(0), 1000, 10, 1.0, 5.0, 20.0, None),
            record("A", day(0), 1000, 10, 1.0, 5.0, 20.0, None),
            record("A", day(1), 1000, 10, 1.0, 5.0, 20.0, None),
            record("C", day(2), 1000, 10, 1.0, 5.0, 20.0, None),
        ];

        let reports = detector.detect(&rows);
        let ids: Vec<&str> = reports.iter().map(|r| r.creative_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_volume_floor_forces_fresh() {
        let detector = FatigueDetector::default();
        // Heavy degradation but only 400 recent impressions.
        let mut rows = Vec::new();
        for offset in (7..30).rev() {
            rows.push(record("C1", day(offset), 2000, 100, 10.0, 50.0, 500.0, None));
        }
        for offset in (0..7).rev() {
            rows.push(record("C1", day(offset), 57, 1, 0.0, 50.0, 0.0, None));
        }

        let reports = detector.detect(&rows);
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert!(report.impressions_7d < 500);
        assert_eq!(report.status, FatigueStatus::Fresh);
        assert_eq!(report.notes, "Insufficient recent volume (<500 impressions)");
    }

    #[test]
    fn test_sustained_degradation_is_fatigued() {
        let detector = FatigueDetector::default();
        let reports = detector.detect(&degrading_creative());
        assert_eq!(reports.len(), 1);
        let report = &reports[0];

        // Recent window: 7 days at ctr 1.5%; baseline: 30 days blended.
        assert_eq!(report.ctr_7d, 1.5);
        assert!(report.ctr_30d > 4.0);
        assert!(report.ctr_drop > 0.6);
        assert!(report.fatigue_score >= 0.5);
        assert_eq!(report.status, FatigueStatus::Fatigued);
        assert!(report.notes.contains("CTR down"));
        assert!(report.notes.contains("ROAS down"));
    }

    #[test]
    fn test_stable_creative_is_fresh() {
        let detector = FatigueDetector::default();
        let rows: Vec<PerformanceRecord> = (0..30)
            .rev()
            .map(|offset| record("C1", day(offset), 1000, 50, 5.0, 50.0, 250.0, None))
            .collect();

        let reports = detector.detect(&rows);
        let report = &reports[0];
        assert_eq!(report.status, FatigueStatus::Fresh);
        assert_eq!(report.fatigue_score, 0.0);
        assert_eq!(report.notes, "Performance stable");
    }

    #[test]
    fn test_single_day_recent_equals_baseline_equals_total() {
        let detector = FatigueDetector::default();
        let rows = vec![record("C1", day(0), 2000, 80, 8.0, 40.0, 160.0, None)];

        let reports = detector.detect(&rows);
        let report = &reports[0];
        assert_eq!(report.impressions, 2000);
        assert_eq!(report.impressions_7d, 2000);
        assert_eq!(report.ctr, report.ctr_7d);
        assert_eq!(report.ctr_7d, report.ctr_30d);
        assert_eq!(report.roas_7d, report.roas_30d);
        assert_eq!(report.fatigue_score, 0.0);
    }

    #[test]
    fn test_campaign_name_passthrough_first_non_null() {
        let detector = FatigueDetector::default();
        let rows = vec![
            record("C1", day(2), 1000, 10, 1.0, 5.0, 20.0, None),
            record("C1", day(1), 1000, 10, 1.0, 5.0, 20.0, Some("Spring Sale")),
            record("C1", day(0), 1000, 10, 1.0, 5.0, 20.0, Some("Renamed")),
            record("C2", day(0), 1000, 10, 1.0, 5.0, 20.0, None),
        ];

        let reports = detector.detect(&rows);
        assert_eq!(reports[0].campaign_name.as_deref(), Some("Spring Sale"));
        assert_eq!(reports[1].campaign_name, None);
    }

    #[test]
    fn test_percent_fields_scaled_and_rounded() {
        let detector = FatigueDetector::default();
        // 33 clicks / 999 impressions = 3.3033...% -> 3.3
        let rows = vec![record("C1", day(0), 999, 33, 3.0, 10.0, 30.0, None)];

        let reports = detector.detect(&rows);
        assert_eq!(reports[0].ctr, 3.3);
        assert_eq!(reports[0].cvr_7d, 9.09);
    }
}
