//! Forecasting Module
//!
//! 統計的予測モジュール

mod forecaster;
mod trend;
mod types;

pub use forecaster::TrafficForecaster;
pub use trend::classify_trend;
pub use types::{Forecast, ForecastConfig, ForecastMethod, ForecastPoint, TrendDirection};
