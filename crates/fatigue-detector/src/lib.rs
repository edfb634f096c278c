//! Creative Fatigue Detection
//!
//! Classifies ad creatives by comparing a trailing recent window against a
//! longer baseline window and scoring the relative degradation.

pub mod config;
pub mod detector;
pub mod report;

pub use config::{DriverThresholds, FatigueConfig, FatigueWeights};
pub use detector::FatigueDetector;
pub use report::{DegradationMetrics, FatigueReport, FatigueStatus};
