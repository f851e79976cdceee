//! サイト健全性スコア算出
//!
//! 検知済みの異常と予測からトラフィック・ランキング・
//! エンゲージメント・安定性の各スコアと総合スコアを算出する。

use crate::analytics::anomaly::{Anomaly, AnomalyKind, AnomalySeverity};
use crate::analytics::forecast::{Forecast, TrendDirection};
use crate::analytics::stats::round_to;
use crate::monitoring::types::MetricType;
use serde::{Deserialize, Serialize};

/// サイト健全性スコア（各値0〜100）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthScore {
    /// 総合スコア
    pub overall: f64,
    /// トラフィック健全性
    pub traffic_health: f64,
    /// ランキング健全性
    pub ranking_health: f64,
    /// エンゲージメント健全性
    pub engagement_health: f64,
    /// メトリクス安定性
    pub stability_score: f64,
    /// スコアに影響した要因
    pub factors: Vec<String>,
}

/// 異常と予測から健全性スコアを算出
///
/// トラフィックは深刻度別の減点、ランキングとエンゲージメントは
/// 悪化方向の異常のみ減点、安定性はボラティリティ件数で減点する。
/// 総合はトラフィック40%・ランキング30%・エンゲージメント20%・
/// 安定性10%の加重平均。
pub fn calculate_health_score(anomalies: &[Anomaly], forecasts: &[Forecast]) -> HealthScore {
    let mut factors: Vec<String> = Vec::new();

    let traffic_penalty: i64 = anomalies
        .iter()
        .filter(|a| a.metric == MetricType::OrganicTraffic)
        .map(|a| match a.severity {
            AnomalySeverity::Critical => 30,
            AnomalySeverity::High => 20,
            AnomalySeverity::Medium => 10,
            AnomalySeverity::Low => 5,
        })
        .sum();
    let mut traffic_health = (100 - traffic_penalty).max(0) as f64;
    if traffic_penalty > 0 {
        factors.push(format!("Traffic anomalies detected (-{traffic_penalty} points)"));
    }

    let ranking_penalty: i64 = anomalies
        .iter()
        .filter(|a| a.metric == MetricType::KeywordRanking && a.is_negative())
        .map(|_| 15)
        .sum();
    let ranking_health = (100 - ranking_penalty).max(0) as f64;
    if ranking_penalty > 0 {
        factors.push(format!("Ranking drops detected (-{ranking_penalty} points)"));
    }

    let engagement_penalty: i64 = anomalies
        .iter()
        .filter(|a| {
            matches!(a.metric, MetricType::Ctr | MetricType::BounceRate) && a.is_negative()
        })
        .map(|_| 10)
        .sum();
    let engagement_health = (100 - engagement_penalty).max(0) as f64;
    if engagement_penalty > 0 {
        factors.push(format!("Engagement issues detected (-{engagement_penalty} points)"));
    }

    let volatility_count = anomalies
        .iter()
        .filter(|a| a.kind == AnomalyKind::Volatility)
        .count() as i64;
    let stability_score = (100 - 20 * volatility_count).max(0) as f64;
    if volatility_count > 0 {
        factors.push(format!(
            "High metric volatility detected (-{} points)",
            20 * volatility_count
        ));
    }

    for forecast in forecasts {
        if forecast.trend_direction == TrendDirection::Decreasing
            && forecast.trend_strength > 0.3
        {
            traffic_health = (traffic_health - 10.0).max(0.0);
            factors.push("Negative traffic forecast (-10 points)".to_string());
            break;
        }
    }

    let overall = 0.4 * traffic_health
        + 0.3 * ranking_health
        + 0.2 * engagement_health
        + 0.1 * stability_score;

    if factors.is_empty() {
        factors.push("All metrics within normal ranges".to_string());
    }

    HealthScore {
        overall: round_to(overall, 1),
        traffic_health: round_to(traffic_health, 1),
        ranking_health: round_to(ranking_health, 1),
        engagement_health: round_to(engagement_health, 1),
        stability_score: round_to(stability_score, 1),
        factors,
    }
}
