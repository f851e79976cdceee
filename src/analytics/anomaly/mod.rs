//! Anomaly Detection Module
//!
//! 異常検知システム

mod detector;
mod hypothesis;
mod types;

pub use detector::AnomalyDetector;
pub use types::{Anomaly, AnomalyConfig, AnomalyKind, AnomalySeverity, Hypothesis};
