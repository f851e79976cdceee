//! Anomaly Detection Types
//!
//! 異常検知用の型定義

use crate::monitoring::types::MetricType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 異常の深刻度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnomalySeverity {
    /// アラートゲート用の序列（低いほど軽微）
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// 異常のパターン分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// 急落
    SuddenDrop,
    /// 急騰
    SuddenSpike,
    /// 緩やかな減少
    GradualDecline,
    /// 緩やかな増加
    GradualIncrease,
    /// ボラティリティ上昇
    Volatility,
    /// 横ばい化
    Flatline,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuddenDrop => "sudden_drop",
            Self::SuddenSpike => "sudden_spike",
            Self::GradualDecline => "gradual_decline",
            Self::GradualIncrease => "gradual_increase",
            Self::Volatility => "volatility",
            Self::Flatline => "flatline",
        }
    }
}

/// 異常原因の仮説
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    /// 仮説の内容
    pub description: String,
    /// 尤度（0.0-1.0）
    pub likelihood: f64,
    /// 仮説を支持する根拠
    pub supporting_evidence: Vec<String>,
    /// 検証手順
    pub investigation_steps: Vec<String>,
}

/// 検知された異常
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: Uuid,
    /// 対象メトリクス
    pub metric: MetricType,
    /// 異常パターン
    pub kind: AnomalyKind,
    /// 深刻度
    pub severity: AnomalySeverity,
    /// 検知時刻
    pub detected_at: DateTime<Utc>,
    /// 観測値
    pub current_value: f64,
    /// 期待値（ベースライン平均）
    pub expected_value: f64,
    /// ベースラインからの乖離率（%）
    pub deviation_percent: f64,
    /// ディメンション（キーワードやページなど）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// ベースライン期間（日数）
    pub baseline_period_days: u32,
    /// Zスコア
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
    /// 全期間に対する百分位
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentile: Option<f64>,
    /// 原因仮説（尤度降順）
    pub hypotheses: Vec<Hypothesis>,
}

impl Anomaly {
    /// SEO観点で悪化方向の異常か
    pub fn is_negative(&self) -> bool {
        matches!(
            self.kind,
            AnomalyKind::SuddenDrop | AnomalyKind::GradualDecline
        )
    }
}

/// 異常検知の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// 軽微と判定するZスコア閾値
    pub low_threshold: f64,
    /// 中程度と判定するZスコア閾値
    pub medium_threshold: f64,
    /// 重度と判定するZスコア閾値
    pub high_threshold: f64,
    /// 危機的と判定するZスコア閾値
    pub critical_threshold: f64,
    /// IQR外れ値判定の係数
    pub iqr_multiplier: f64,
    /// 検知に必要な最小データ点数
    pub min_data_points: usize,
    /// ベースライン期間（日数）
    pub baseline_window_days: u32,
    /// 報告対象とする最小変化率（%）
    pub min_change_percent: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            low_threshold: 1.5,
            medium_threshold: 2.0,
            high_threshold: 2.5,
            critical_threshold: 3.0,
            iqr_multiplier: 1.5,
            min_data_points: 7,
            baseline_window_days: 30,
            min_change_percent: 5.0,
        }
    }
}
