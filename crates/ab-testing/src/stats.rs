//! Two-sample proportion testing.

use statrs::distribution::{ContinuousCDF, Normal};

/// Outcome of a pooled two-proportion z-test.
#[derive(Debug, Clone, Copy)]
pub struct ProportionComparison {
    pub z_score: f64,
    /// Two-tailed p-value.
    pub p_value: f64,
}

/// Pooled-proportion two-sample z-test for binomial rates.
///
/// Returns `None` when the test is degenerate: either sample empty, or the
/// pooled proportion at 0 or 1 (standard error undefined). Callers treat
/// that as "not significant" (p = 1.0).
pub fn two_proportion_z_test(
    p1: f64,
    n1: u64,
    p2: f64,
    n2: u64,
) -> Option<ProportionComparison> {
    if n1 == 0 || n2 == 0 {
        return None;
    }

    let (n1, n2) = (n1 as f64, n2 as f64);
    let p_pool = (p1 * n1 + p2 * n2) / (n1 + n2);
    if p_pool <= 0.0 || p_pool >= 1.0 {
        return None;
    }

    let se = (p_pool * (1.0 - p_pool) * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se <= 0.0 {
        return None;
    }

    let z_score = (p1 - p2) / se;
    let normal = Normal::new(0.0, 1.0).unwrap();
    let p_value = 2.0 * (1.0 - normal.cdf(z_score.abs()));

    Some(ProportionComparison { z_score, p_value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_proportions_not_significant() {
        let result = two_proportion_z_test(0.05, 10_000, 0.05, 10_000).unwrap();
        assert_eq!(result.z_score, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_large_effect_large_sample_significant() {
        // 10% vs 5% on 100k impressions each.
        let result = two_proportion_z_test(0.10, 100_000, 0.05, 100_000).unwrap();
        assert!(result.z_score > 30.0);
        assert!(result.p_value < 0.001);
    }

    #[test]
    fn test_small_sample_not_significant() {
        // Same 2:1 rate ratio but only 40 trials each.
        let result = two_proportion_z_test(0.10, 40, 0.05, 40).unwrap();
        assert!(result.p_value > 0.05);
    }

    #[test]
    fn test_degenerate_cases() {
        assert!(two_proportion_z_test(0.1, 0, 0.2, 100).is_none());
        assert!(two_proportion_z_test(0.1, 100, 0.2, 0).is_none());
        // Pooled proportion 0 and 1
        assert!(two_proportion_z_test(0.0, 100, 0.0, 100).is_none());
        assert!(two_proportion_z_test(1.0, 100, 1.0, 100).is_none());
    }

    #[test]
    fn test_direction_symmetry() {
        let ab = two_proportion_z_test(0.10, 5000, 0.05, 5000).unwrap();
        let ba = two_proportion_z_test(0.05, 5000, 0.10, 5000).unwrap();
        assert!((ab.z_score + ba.z_score).abs() < 1e-12);
        assert!((ab.p_value - ba.p_value).abs() < 1e-12);
    }
}
