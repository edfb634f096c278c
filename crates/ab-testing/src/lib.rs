//! A/B Testing
//!
//! Manages comparison experiments between creative variants and computes
//! statistical significance from raw performance rows.

pub mod manager;
pub mod stats;
pub mod store;
pub mod types;

pub use manager::ABTestManager;
pub use stats::{two_proportion_z_test, ProportionComparison};
pub use store::{InMemoryTestStore, TestStore};
pub use types::{
    ABTest, Metric, TestAnalysis, TestDefinition, TestStatus, TestSummary, VariantKey,
    VariantStats,
};
