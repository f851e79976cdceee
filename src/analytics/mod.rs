//! Analytics Module
//!
//! 統計的異常検知・予測分析システム

pub mod anomaly;
pub mod forecast;
pub mod stats;

pub use anomaly::{Anomaly, AnomalyConfig, AnomalyDetector, AnomalyKind, AnomalySeverity};
pub use forecast::{Forecast, ForecastConfig, ForecastMethod, TrafficForecaster, TrendDirection};
