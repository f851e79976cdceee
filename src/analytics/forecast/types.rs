//! Forecast Types
//!
//! 予測分析用の型定義

use crate::monitoring::types::MetricType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// トレンド方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// 上昇トレンド
    Increasing,
    /// 下降トレンド
    Decreasing,
    /// 安定
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

/// 予測手法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// 移動平均
    MovingAverage,
    /// 線形回帰
    LinearTrend,
    /// 指数加重平均
    WeightedAverage,
    /// アンサンブル
    Ensemble,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MovingAverage => "moving_average",
            Self::LinearTrend => "linear_trend",
            Self::WeightedAverage => "weighted_average",
            Self::Ensemble => "ensemble",
        }
    }

    /// 説明文用の手法表現
    pub fn description(&self) -> &'static str {
        match self {
            Self::MovingAverage => "using moving average smoothing",
            Self::LinearTrend => "using linear trend projection",
            Self::WeightedAverage => "using weighted recent values",
            Self::Ensemble => "using an ensemble of statistical methods",
        }
    }
}

/// 1日分の予測値
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// 予測対象日
    pub date: NaiveDate,
    /// 予測値
    pub predicted_value: f64,
    /// 下限（95%信頼区間、0以上）
    pub lower_bound: f64,
    /// 上限（95%信頼区間）
    pub upper_bound: f64,
    /// 信頼度（0.0-1.0）
    pub confidence: f64,
}

/// メトリクス×ディメンション単位の予測結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub id: Uuid,
    /// 対象メトリクス
    pub metric: MetricType,
    /// ディメンション
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// 使用した予測手法
    pub method: ForecastMethod,
    /// 30日後の予測
    pub forecast_30d: ForecastPoint,
    /// 60日後の予測
    pub forecast_60d: ForecastPoint,
    /// 90日後の予測
    pub forecast_90d: ForecastPoint,
    /// 日次予測系列
    pub daily_forecasts: Vec<ForecastPoint>,
    /// バックテストによる精度（1 - MAPE）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_accuracy: Option<f64>,
    /// トレンド方向
    pub trend_direction: TrendDirection,
    /// トレンド強度（0.0-1.0）
    pub trend_strength: f64,
    /// 予測根拠の説明
    pub explanation: String,
    /// 予測に影響する要因
    pub factors: Vec<String>,
    /// 生成時刻
    pub generated_at: DateTime<Utc>,
}

/// 予測の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// 移動平均のウィンドウ幅（日数）
    pub ma_window: usize,
    /// 予測に必要な最小データ点数
    pub min_data_points: usize,
    /// 予測ホライズン（日数）
    pub horizons: Vec<u32>,
    /// アンサンブル手法を使うか
    pub use_ensemble: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            ma_window: 7,
            min_data_points: 14,
            horizons: vec![30, 60, 90],
            use_ensemble: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_direction_wire_names() {
        assert_eq!(TrendDirection::Increasing.as_str(), "increasing");
        assert_eq!(TrendDirection::Stable.as_str(), "stable");
    }

    #[test]
    fn test_method_descriptions() {
        assert_eq!(
            ForecastMethod::Ensemble.description(),
            "using an ensemble of statistical methods"
        );
        assert_eq!(ForecastMethod::MovingAverage.as_str(), "moving_average");
    }

    #[test]
    fn test_config_defaults() {
        let config = ForecastConfig::default();
        assert_eq!(config.ma_window, 7);
        assert_eq!(config.min_data_points, 14);
        assert_eq!(config.horizons, vec![30, 60, 90]);
        assert!(config.use_ensemble);
    }
}
