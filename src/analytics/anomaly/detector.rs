//! Anomaly Detector Implementation
//!
//! SEOメトリクス時系列の統計的異常検知器
//!
//! Zスコア法とIQR法の組み合わせで判定する。全ての検知は決定的で、
//! ブラックボックスの機械学習は使わない。

use crate::analytics::anomaly::hypothesis::generate_hypotheses;
use crate::analytics::anomaly::types::{
    Anomaly, AnomalyConfig, AnomalyKind, AnomalySeverity, Hypothesis,
};
use crate::analytics::stats;
use crate::monitoring::types::TimeSeries;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// 直近何日分を評価対象とするか
const RECENT_WINDOW_DAYS: usize = 7;

/// 緩やかな変化と判定するトレンド閾値（期間あたり変化率）
const GRADUAL_TREND_THRESHOLD: f64 = 0.02;

/// 時系列異常検知器
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    /// 設定から検知器を作成
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// 時系列の直近データから異常を検知する
    ///
    /// 系列全体の平均・標準偏差・四分位をベースラインとし、
    /// 直近7日分の各点をZスコアとIQR外れ値で評価する。
    /// sensitivityはZスコアの検知閾値（小さいほど敏感）。
    pub fn detect(&self, series: &TimeSeries, sensitivity: f64) -> Vec<Anomaly> {
        let values = series.values();

        if values.len() < self.config.min_data_points {
            warn!(
                metric = %series.metric,
                required = self.config.min_data_points,
                actual = values.len(),
                "insufficient data points for anomaly detection"
            );
            return Vec::new();
        }

        let mean = stats::mean(&values);
        let stdev = stats::sample_stdev(&values);
        let sorted_values = stats::sorted(&values);
        let (q1, q3) = stats::quartiles(&sorted_values);
        let iqr = q3 - q1;
        let lower_bound = q1 - self.config.iqr_multiplier * iqr;
        let upper_bound = q3 + self.config.iqr_multiplier * iqr;

        let recent_window = RECENT_WINDOW_DAYS.min(values.len());
        let mut anomalies = Vec::new();

        for idx in values.len() - recent_window..values.len() {
            let value = values[idx];
            let date = series.points[idx].date;

            let z_score = if stdev > 0.0 {
                (value - mean) / stdev
            } else {
                0.0
            };
            let is_iqr_outlier = value < lower_bound || value > upper_bound;

            let Some(severity) = self.severity_for(z_score.abs()) else {
                continue;
            };
            if z_score.abs() < sensitivity && !is_iqr_outlier {
                continue;
            }

            let deviation_percent = if mean > 0.0 {
                (value - mean) / mean * 100.0
            } else {
                0.0
            };
            if deviation_percent.abs() < self.config.min_change_percent {
                continue;
            }

            let kind = classify_kind(value, mean, &values[..idx]);
            let hypotheses = generate_hypotheses(series.metric, kind, deviation_percent, date);

            let anomaly = Anomaly {
                id: Uuid::new_v4(),
                metric: series.metric,
                kind,
                severity,
                detected_at: Utc::now(),
                current_value: value,
                expected_value: mean,
                deviation_percent: stats::round_to(deviation_percent, 2),
                dimension: series.dimension.clone(),
                baseline_period_days: self.config.baseline_window_days,
                z_score: Some(stats::round_to(z_score, 2)),
                percentile: Some(stats::percentile_of(value, &values)),
                hypotheses,
            };

            info!(
                metric = %series.metric,
                kind = kind.as_str(),
                severity = severity.as_str(),
                z_score = stats::round_to(z_score, 2),
                deviation = format!("{deviation_percent:.1}%"),
                "anomaly detected"
            );
            anomalies.push(anomaly);
        }

        anomalies
    }

    /// 直近と過去のボラティリティ比較で不安定化を検知する
    ///
    /// 直近window日の標本標準偏差が過去の2倍を超えた場合に
    /// Volatility異常（Medium固定）を返す。
    pub fn detect_volatility(&self, series: &TimeSeries, window_days: usize) -> Option<Anomaly> {
        let values = series.values();
        if values.len() < window_days * 2 {
            return None;
        }

        let split = values.len() - window_days;
        let historical = &values[..split];
        let recent = &values[split..];

        let recent_stdev = stats::sample_stdev(recent);
        let historical_stdev = stats::sample_stdev(historical);
        if historical_stdev == 0.0 {
            return None;
        }

        let ratio = recent_stdev / historical_stdev;
        if ratio <= 2.0 {
            return None;
        }

        Some(Anomaly {
            id: Uuid::new_v4(),
            metric: series.metric,
            kind: AnomalyKind::Volatility,
            severity: AnomalySeverity::Medium,
            detected_at: Utc::now(),
            current_value: recent_stdev,
            expected_value: historical_stdev,
            deviation_percent: stats::round_to((ratio - 1.0) * 100.0, 2),
            dimension: series.dimension.clone(),
            baseline_period_days: historical.len() as u32,
            z_score: None,
            percentile: None,
            hypotheses: vec![Hypothesis {
                description: "Unusual metric volatility detected".to_string(),
                likelihood: 0.5,
                supporting_evidence: vec![format!("Recent volatility is {ratio:.1}x historical")],
                investigation_steps: vec![
                    "Review for external factors (news, events)".to_string(),
                    "Check for technical issues causing spikes".to_string(),
                    "Monitor for stabilization over next week".to_string(),
                ],
            }],
        })
    }

    /// Zスコア絶対値から深刻度を判定（閾値未満はNone）
    fn severity_for(&self, abs_z_score: f64) -> Option<AnomalySeverity> {
        if abs_z_score >= self.config.critical_threshold {
            Some(AnomalySeverity::Critical)
        } else if abs_z_score >= self.config.high_threshold {
            Some(AnomalySeverity::High)
        } else if abs_z_score >= self.config.medium_threshold {
            Some(AnomalySeverity::Medium)
        } else if abs_z_score >= self.config.low_threshold {
            Some(AnomalySeverity::Low)
        } else {
            None
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyConfig::default())
    }
}

/// 急変か緩やかな変化かを過去データのトレンドで分類する
fn classify_kind(current_value: f64, mean: f64, historical_values: &[f64]) -> AnomalyKind {
    let recent_trend = if historical_values.len() >= 3 {
        let tail_start = historical_values.len().saturating_sub(RECENT_WINDOW_DAYS);
        half_over_half_trend(&historical_values[tail_start..])
    } else {
        0.0
    };

    let is_decline = current_value < mean;
    let is_gradual = recent_trend.abs() > GRADUAL_TREND_THRESHOLD;

    match (is_decline, is_gradual) {
        (true, true) => AnomalyKind::GradualDecline,
        (true, false) => AnomalyKind::SuddenDrop,
        (false, true) => AnomalyKind::GradualIncrease,
        (false, false) => AnomalyKind::SuddenSpike,
    }
}

/// 前半平均に対する後半平均の変化率
fn half_over_half_trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mid = values.len() / 2;
    let first_half = stats::mean(&values[..mid]);
    let second_half = stats::mean(&values[mid..]);
    if first_half == 0.0 {
        return 0.0;
    }
    (second_half - first_half) / first_half
}
