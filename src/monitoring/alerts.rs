//! アラート管理システム
//!
//! 検知された異常と悪化予測から、調査手順と推奨アクションを
//! 含む行動可能なアラートを生成・保持する。

use crate::analytics::anomaly::{Anomaly, AnomalyKind, AnomalySeverity};
use crate::analytics::forecast::{Forecast, TrendDirection};
use crate::monitoring::types::MetricType;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// アラートの優先度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    /// 情報
    Info,
    /// 警告
    Warning,
    /// 緊急
    Urgent,
    /// 致命的
    Critical,
}

impl AlertPriority {
    /// ソート順を取得（小さいほど重要）
    pub fn sort_order(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Urgent => 1,
            Self::Warning => 2,
            Self::Info => 3,
        }
    }

    /// 優先度名を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Urgent => "urgent",
            Self::Critical => "critical",
        }
    }
}

/// 調査手順の1ステップ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationStep {
    /// 実施順序（1始まり）
    pub order: u32,
    /// 実施内容
    pub action: String,
    /// 使用するツールやリソース
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_or_resource: Option<String>,
    /// 期待される成果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,
}

/// 生成されたアラート
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// アラートID
    pub id: Uuid,
    /// 優先度
    pub priority: AlertPriority,
    /// タイトル
    pub title: String,
    /// 詳細説明
    pub description: String,
    /// 発生元の異常ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_id: Option<Uuid>,
    /// 発生元の予測ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_id: Option<Uuid>,
    /// 対象メトリクス
    pub metric: MetricType,
    /// ディメンション
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// 現在値
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    /// 比較基準値
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_value: Option<f64>,
    /// 調査手順
    pub investigation_steps: Vec<InvestigationStep>,
    /// 推奨アクション
    pub recommended_actions: Vec<String>,
    /// 生成時刻
    pub created_at: DateTime<Utc>,
    /// 失効時刻
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// 確認済みフラグ
    #[serde(default)]
    pub acknowledged: bool,
    /// 確認時刻
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// 確認者
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
}

/// アラート生成の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// アラート化する最小深刻度
    pub min_severity: AnomalySeverity,
    /// 予測アラートを出す30日減少率の閾値（%）
    pub negative_forecast_threshold: f64,
    /// アラートの有効期間（時間）
    pub alert_expiration_hours: i64,
    /// 1回の実行で生成する最大アラート数
    pub max_alerts_per_run: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_severity: AnomalySeverity::Medium,
            negative_forecast_threshold: 10.0,
            alert_expiration_hours: 168,
            max_alerts_per_run: 20,
        }
    }
}

/// アラートマネージャー
pub struct AlertManager {
    config: AlertConfig,
    history: Arc<RwLock<Vec<Alert>>>,
}

impl AlertManager {
    /// 設定からマネージャーを作成
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// 異常と予測からアラートを生成
    ///
    /// 優先度順（Critical先頭、同順位は生成順）に整列し、
    /// 1回の実行あたりの上限で切り詰める。生成分は履歴にも残す。
    pub async fn generate(&self, anomalies: &[Anomaly], forecasts: &[Forecast]) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = Vec::new();

        for anomaly in anomalies {
            if let Some(alert) = self.anomaly_alert(anomaly) {
                alerts.push(alert);
            }
        }
        for forecast in forecasts {
            if let Some(alert) = self.forecast_alert(forecast) {
                alerts.push(alert);
            }
        }

        alerts.sort_by_key(|a| a.priority.sort_order());
        alerts.truncate(self.config.max_alerts_per_run);

        info!(
            total = alerts.len(),
            from_anomalies = alerts.iter().filter(|a| a.anomaly_id.is_some()).count(),
            from_forecasts = alerts.iter().filter(|a| a.forecast_id.is_some()).count(),
            "alerts generated"
        );

        self.history.write().await.extend(alerts.iter().cloned());
        alerts
    }

    /// 異常からアラートを作成（最小深刻度未満はNone）
    fn anomaly_alert(&self, anomaly: &Anomaly) -> Option<Alert> {
        if anomaly.severity.rank() < self.config.min_severity.rank() {
            return None;
        }

        let priority = match anomaly.severity {
            AnomalySeverity::Low => AlertPriority::Info,
            AnomalySeverity::Medium => AlertPriority::Warning,
            AnomalySeverity::High => AlertPriority::Urgent,
            AnomalySeverity::Critical => AlertPriority::Critical,
        };

        let now = Utc::now();
        Some(Alert {
            id: Uuid::new_v4(),
            priority,
            title: anomaly_title(anomaly),
            description: anomaly_description(anomaly),
            anomaly_id: Some(anomaly.id),
            forecast_id: None,
            metric: anomaly.metric,
            dimension: anomaly.dimension.clone(),
            current_value: Some(anomaly.current_value),
            threshold_value: Some(anomaly.expected_value),
            investigation_steps: investigation_steps(anomaly),
            recommended_actions: recommended_actions(anomaly),
            created_at: now,
            expires_at: Some(now + Duration::hours(self.config.alert_expiration_hours)),
            acknowledged: false,
            acknowledged_at: None,
            acknowledged_by: None,
        })
    }

    /// 悪化予測からアラートを作成（減少率が閾値未満ならNone）
    fn forecast_alert(&self, forecast: &Forecast) -> Option<Alert> {
        if forecast.trend_direction != TrendDirection::Decreasing {
            return None;
        }

        let current = forecast
            .daily_forecasts
            .first()
            .map(|p| p.predicted_value)
            .unwrap_or(0.0);
        if current == 0.0 {
            return None;
        }

        let future_30d = forecast.forecast_30d.predicted_value;
        let decline_percent = (current - future_30d) / current * 100.0;
        if decline_percent < self.config.negative_forecast_threshold {
            return None;
        }

        let priority = if decline_percent >= 30.0 {
            AlertPriority::Critical
        } else if decline_percent >= 20.0 {
            AlertPriority::Urgent
        } else {
            AlertPriority::Warning
        };

        let steps = vec![
            InvestigationStep {
                order: 1,
                action: "Review recent content and technical changes".to_string(),
                tool_or_resource: Some("CMS / Git history".to_string()),
                expected_outcome: Some("Identify potential causes of decline".to_string()),
            },
            InvestigationStep {
                order: 2,
                action: "Check Google Search Console for issues".to_string(),
                tool_or_resource: Some("Google Search Console".to_string()),
                expected_outcome: Some("Identify indexing or ranking issues".to_string()),
            },
            InvestigationStep {
                order: 3,
                action: "Analyze competitor movements".to_string(),
                tool_or_resource: Some("SEO tools (Ahrefs, SEMrush)".to_string()),
                expected_outcome: Some("Understand competitive landscape changes".to_string()),
            },
        ];

        let now = Utc::now();
        Some(Alert {
            id: Uuid::new_v4(),
            priority,
            title: format!(
                "Forecasted {decline_percent:.0}% decline in {}",
                forecast.metric.name()
            ),
            description: format!(
                "Based on current trends, {} is projected to decline by {decline_percent:.1}% \
                 over the next 30 days. {}",
                forecast.metric.name(),
                forecast.explanation
            ),
            anomaly_id: None,
            forecast_id: Some(forecast.id),
            metric: forecast.metric,
            dimension: forecast.dimension.clone(),
            current_value: Some(current),
            threshold_value: Some(future_30d),
            investigation_steps: steps,
            recommended_actions: vec![
                "Prioritize content optimization for declining pages".to_string(),
                "Review and update technical SEO elements".to_string(),
                "Consider new content creation for traffic recovery".to_string(),
            ],
            created_at: now,
            expires_at: Some(now + Duration::hours(self.config.alert_expiration_hours)),
            acknowledged: false,
            acknowledged_at: None,
            acknowledged_by: None,
        })
    }

    /// 未確認かつ未失効のアラートを取得
    pub async fn active_alerts(&self) -> Vec<Alert> {
        let now = Utc::now();
        self.history
            .read()
            .await
            .iter()
            .filter(|a| !a.acknowledged && a.expires_at.map(|e| e > now).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// アラートを確認済みにする（見つからなければfalse）
    pub async fn acknowledge(&self, alert_id: Uuid, acknowledged_by: &str) -> bool {
        let mut history = self.history.write().await;
        match history.iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.acknowledged = true;
                alert.acknowledged_at = Some(Utc::now());
                alert.acknowledged_by = Some(acknowledged_by.to_string());
                true
            }
            None => false,
        }
    }

    /// 失効したアラートを履歴から削除し、削除数を返す
    pub async fn clear_expired(&self) -> usize {
        let now = Utc::now();
        let mut history = self.history.write().await;
        let before = history.len();
        history.retain(|a| a.expires_at.map(|e| e > now).unwrap_or(true));
        before - history.len()
    }

    /// 履歴の総数を取得
    pub async fn history_count(&self) -> usize {
        self.history.read().await.len()
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

/// 異常アラートのタイトルを組み立てる
fn anomaly_title(anomaly: &Anomaly) -> String {
    let metric_name = anomaly.metric.display_name();
    let verb = match anomaly.kind {
        AnomalyKind::SuddenDrop => "dropped",
        AnomalyKind::SuddenSpike => "spiked",
        AnomalyKind::GradualDecline => "declining",
        AnomalyKind::GradualIncrease => "increasing",
        AnomalyKind::Volatility => "showing high volatility",
        AnomalyKind::Flatline => "flatlined",
    };

    match &anomaly.dimension {
        Some(dimension) => format!("{metric_name} {verb} for '{dimension}'"),
        None => format!(
            "{metric_name} {verb} by {:.0}%",
            anomaly.deviation_percent.abs()
        ),
    }
}

/// 異常アラートの説明文を組み立てる
fn anomaly_description(anomaly: &Anomaly) -> String {
    let direction = if anomaly.is_negative() {
        "decreased"
    } else {
        "increased"
    };

    let mut parts = vec![
        format!(
            "{} has {direction} by {:.1}% compared to the baseline.",
            anomaly.metric.display_name(),
            anomaly.deviation_percent.abs()
        ),
        format!(
            "Current value: {:.2}, Expected: {:.2}",
            anomaly.current_value, anomaly.expected_value
        ),
    ];

    if let Some(z_score) = anomaly.z_score {
        if z_score != 0.0 {
            parts.push(format!(
                "Statistical significance: {:.1} standard deviations from mean",
                z_score.abs()
            ));
        }
    }

    if let Some(top) = anomaly.hypotheses.first() {
        parts.push(format!("Possible cause: {}", top.description));
    }

    parts.join(" ")
}

/// 仮説の調査手順をアラートのステップに変換
///
/// 上位2仮説から各2ステップを採り、3件に満たない場合は
/// メトリクス別の汎用ステップで補う。
fn investigation_steps(anomaly: &Anomaly) -> Vec<InvestigationStep> {
    let mut steps: Vec<InvestigationStep> = Vec::new();
    let mut order = 1u32;

    for hypothesis in anomaly.hypotheses.iter().take(2) {
        for action in hypothesis.investigation_steps.iter().take(2) {
            steps.push(InvestigationStep {
                order,
                action: action.clone(),
                tool_or_resource: tool_for_step(action).map(String::from),
                expected_outcome: Some(outcome_for_step(action, anomaly.kind)),
            });
            order += 1;
        }
    }

    if steps.len() < 3 {
        let needed = 3 - steps.len();
        for (action, tool, outcome) in generic_steps(anomaly.metric).into_iter().take(needed) {
            steps.push(InvestigationStep {
                order,
                action: action.to_string(),
                tool_or_resource: Some(tool.to_string()),
                expected_outcome: Some(outcome.to_string()),
            });
            order += 1;
        }
    }

    steps
}

/// ステップ文面から使用ツールを推定（表の先頭一致優先）
fn tool_for_step(action: &str) -> Option<&'static str> {
    const TOOL_MAPPING: [(&str, &str); 12] = [
        ("gsc", "Google Search Console"),
        ("search console", "Google Search Console"),
        ("coverage", "Google Search Console"),
        ("indexing", "Google Search Console"),
        ("serp", "SERP checker tool"),
        ("competitor", "Ahrefs / SEMrush"),
        ("backlink", "Ahrefs / Majestic"),
        ("robots.txt", "Server / robots.txt file"),
        ("mobile", "Google Mobile-Friendly Test"),
        ("server", "Server logs / monitoring"),
        ("trends", "Google Trends"),
        ("title", "CMS / SEO tool"),
    ];

    let lower = action.to_lowercase();
    TOOL_MAPPING
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, tool)| *tool)
}

/// ステップ文面から期待成果を推定
fn outcome_for_step(action: &str, kind: AnomalyKind) -> String {
    let lower = action.to_lowercase();

    if lower.contains("error") || lower.contains("issue") {
        "Identify any technical issues affecting the site".to_string()
    } else if lower.contains("competitor") {
        "Understand competitive landscape changes".to_string()
    } else if lower.contains("ranking") {
        "Identify specific ranking changes".to_string()
    } else if lower.contains("content") {
        "Find content that may need optimization".to_string()
    } else if lower.contains("backlink") {
        "Identify link profile changes".to_string()
    } else {
        format!("Gather data to explain {}", kind.as_str())
    }
}

/// メトリクス別の汎用調査ステップ
fn generic_steps(metric: MetricType) -> Vec<(&'static str, &'static str, &'static str)> {
    match metric {
        MetricType::OrganicTraffic => vec![
            (
                "Check Google Search Console for any notices or manual actions",
                "Google Search Console",
                "Identify any Google-imposed restrictions",
            ),
            (
                "Review recent site changes in version control",
                "Git / CMS",
                "Identify potential technical causes",
            ),
            (
                "Analyze top landing pages for traffic changes",
                "Google Analytics",
                "Pinpoint affected pages",
            ),
        ],
        MetricType::KeywordRanking => vec![
            (
                "Compare current SERP with previous snapshot",
                "SERP tracker",
                "Identify what changed in search results",
            ),
            (
                "Analyze content quality vs new ranking pages",
                "Content analyzer",
                "Identify content gaps",
            ),
        ],
        MetricType::Ctr => vec![
            (
                "Review title tags and meta descriptions",
                "SEO audit tool",
                "Identify snippet optimization opportunities",
            ),
            (
                "Check for new SERP features affecting clicks",
                "SERP analyzer",
                "Understand SERP layout changes",
            ),
        ],
        _ => vec![(
            "Review metric data in detail",
            "Analytics platform",
            "Understand the scope of the change",
        )],
    }
}

/// 異常の方向とメトリクスに応じた推奨アクション（最大5件）
fn recommended_actions(anomaly: &Anomaly) -> Vec<String> {
    let actions: Vec<&str> = if anomaly.is_negative() {
        match anomaly.metric {
            MetricType::OrganicTraffic => vec![
                "Audit technical SEO for any crawling/indexing issues",
                "Review and refresh underperforming content",
                "Check for algorithm update impacts",
            ],
            MetricType::KeywordRanking => vec![
                "Analyze competitor content that outranks you",
                "Update content to better match search intent",
                "Strengthen internal linking to affected pages",
            ],
            MetricType::Ctr => vec![
                "A/B test different title variations",
                "Enhance meta descriptions with compelling CTAs",
                "Add structured data for rich snippets",
            ],
            _ => vec!["Investigate root cause before taking action"],
        }
    } else {
        vec![
            "Identify what's working and replicate it",
            "Monitor to ensure gains are sustained",
            "Document successful tactics for future reference",
        ]
    };

    actions.into_iter().take(5).map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::anomaly::Hypothesis;
    use crate::analytics::forecast::{ForecastMethod, ForecastPoint};
    use chrono::NaiveDate;

    fn traffic_drop_anomaly() -> Anomaly {
        Anomaly {
            id: Uuid::new_v4(),
            metric: MetricType::OrganicTraffic,
            kind: AnomalyKind::SuddenDrop,
            severity: AnomalySeverity::Critical,
            detected_at: Utc::now(),
            current_value: 550.0,
            expected_value: 1000.0,
            deviation_percent: -45.3,
            dimension: None,
            baseline_period_days: 30,
            z_score: Some(-2.5),
            percentile: Some(3.3),
            hypotheses: vec![
                Hypothesis {
                    description: "Google algorithm update may have affected rankings".to_string(),
                    likelihood: 0.3,
                    supporting_evidence: vec![],
                    investigation_steps: vec![
                        "Check Google Search Status Dashboard".to_string(),
                        "Review GSC for manual actions".to_string(),
                        "Compare ranking changes for top keywords".to_string(),
                    ],
                },
                Hypothesis {
                    description: "Technical issue may be blocking crawling/indexing".to_string(),
                    likelihood: 0.25,
                    supporting_evidence: vec![],
                    investigation_steps: vec![
                        "Check GSC Coverage report for errors".to_string(),
                        "Verify robots.txt hasn't changed".to_string(),
                    ],
                },
            ],
        }
    }

    fn declining_forecast(day1: f64, day30: f64) -> Forecast {
        let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let point = |day: i64, value: f64| ForecastPoint {
            date: start + Duration::days(day),
            predicted_value: value,
            lower_bound: value * 0.8,
            upper_bound: value * 1.2,
            confidence: 0.7,
        };
        Forecast {
            id: Uuid::new_v4(),
            metric: MetricType::OrganicTraffic,
            dimension: None,
            method: ForecastMethod::Ensemble,
            forecast_30d: point(30, day30),
            forecast_60d: point(60, day30 * 0.9),
            forecast_90d: point(90, day30 * 0.8),
            daily_forecasts: vec![point(1, day1)],
            model_accuracy: Some(0.9),
            trend_direction: TrendDirection::Decreasing,
            trend_strength: 0.6,
            explanation: "The metric shows a decreasing trend.".to_string(),
            factors: vec![],
            generated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_low_severity_filtered_by_default() {
        let manager = AlertManager::default();
        let mut anomaly = traffic_drop_anomaly();
        anomaly.severity = AnomalySeverity::Low;

        let alerts = manager.generate(&[anomaly], &[]).await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_critical_anomaly_becomes_critical_alert() {
        let manager = AlertManager::default();
        let alerts = manager.generate(&[traffic_drop_anomaly()], &[]).await;

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.priority, AlertPriority::Critical);
        assert_eq!(alert.title, "Organic Traffic dropped by 45%");
        assert_eq!(alert.current_value, Some(550.0));
        assert_eq!(alert.threshold_value, Some(1000.0));
        assert!(alert.expires_at.unwrap() > Utc::now());
    }

    #[test]
    fn test_description_contains_statistics_and_cause() {
        let description = anomaly_description(&traffic_drop_anomaly());

        assert!(description.contains("Organic Traffic has decreased by 45.3%"));
        assert!(description.contains("Current value: 550.00, Expected: 1000.00"));
        assert!(
            description.contains("Statistical significance: 2.5 standard deviations from mean")
        );
        assert!(
            description.contains("Possible cause: Google algorithm update may have affected")
        );
    }

    #[test]
    fn test_dimension_title_omits_percent() {
        let mut anomaly = traffic_drop_anomaly();
        anomaly.metric = MetricType::KeywordRanking;
        anomaly.kind = AnomalyKind::GradualDecline;
        anomaly.dimension = Some("running shoes".to_string());

        assert_eq!(
            anomaly_title(&anomaly),
            "Keyword Ranking declining for 'running shoes'"
        );
    }

    #[test]
    fn test_investigation_steps_from_hypotheses() {
        let steps = investigation_steps(&traffic_drop_anomaly());

        // 上位2仮説×各2ステップ
        assert_eq!(steps.len(), 4);
        assert_eq!(
            steps.iter().map(|s| s.order).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );

        // "GSC"を含むステップはSearch Consoleに対応付く
        assert_eq!(
            steps[1].tool_or_resource.as_deref(),
            Some("Google Search Console")
        );
        // エラー調査のステップは技術要因の特定が成果になる
        assert_eq!(
            steps[2].expected_outcome.as_deref(),
            Some("Identify any technical issues affecting the site")
        );
        // 対応表にない文面は異常種別の説明収集にフォールバック
        assert_eq!(
            steps[0].expected_outcome.as_deref(),
            Some("Gather data to explain sudden_drop")
        );
        assert_eq!(
            steps[3].tool_or_resource.as_deref(),
            Some("Server / robots.txt file")
        );
    }

    #[test]
    fn test_generic_steps_pad_when_no_hypotheses() {
        let mut anomaly = traffic_drop_anomaly();
        anomaly.hypotheses.clear();
        anomaly.metric = MetricType::BounceRate;

        let steps = investigation_steps(&anomaly);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action, "Review metric data in detail");

        anomaly.metric = MetricType::OrganicTraffic;
        let steps = investigation_steps(&anomaly);
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[0].action,
            "Check Google Search Console for any notices or manual actions"
        );
    }

    #[test]
    fn test_negative_actions_by_metric() {
        let mut anomaly = traffic_drop_anomaly();
        anomaly.metric = MetricType::Ctr;

        let actions = recommended_actions(&anomaly);
        assert_eq!(actions[0], "A/B test different title variations");

        // 改善方向の異常には定着施策を勧める
        anomaly.kind = AnomalyKind::SuddenSpike;
        let actions = recommended_actions(&anomaly);
        assert_eq!(actions[0], "Identify what's working and replicate it");
    }

    #[tokio::test]
    async fn test_forecast_decline_priority_ladder() {
        let manager = AlertManager::default();

        // 30%減少はCritical
        let alerts = manager
            .generate(&[], &[declining_forecast(1000.0, 700.0)])
            .await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].priority, AlertPriority::Critical);
        assert_eq!(alerts[0].title, "Forecasted 30% decline in organic_traffic");
        assert_eq!(alerts[0].threshold_value, Some(700.0));
        assert_eq!(alerts[0].investigation_steps.len(), 3);

        // 15%減少はWarning
        let alerts = manager
            .generate(&[], &[declining_forecast(1000.0, 850.0)])
            .await;
        assert_eq!(alerts[0].priority, AlertPriority::Warning);
    }

    #[tokio::test]
    async fn test_small_decline_produces_no_alert() {
        let manager = AlertManager::default();
        let alerts = manager
            .generate(&[], &[declining_forecast(1000.0, 950.0)])
            .await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_stable_forecast_produces_no_alert() {
        let manager = AlertManager::default();
        let mut forecast = declining_forecast(1000.0, 700.0);
        forecast.trend_direction = TrendDirection::Stable;

        let alerts = manager.generate(&[], &[forecast]).await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_alerts_sorted_by_priority() {
        let manager = AlertManager::default();
        let mut medium = traffic_drop_anomaly();
        medium.severity = AnomalySeverity::Medium;
        let mut high = traffic_drop_anomaly();
        high.severity = AnomalySeverity::High;

        let alerts = manager
            .generate(
                &[medium, high],
                &[declining_forecast(1000.0, 700.0)],
            )
            .await;

        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].priority, AlertPriority::Critical);
        assert_eq!(alerts[1].priority, AlertPriority::Urgent);
        assert_eq!(alerts[2].priority, AlertPriority::Warning);
    }

    #[tokio::test]
    async fn test_max_alerts_cap() {
        let config = AlertConfig {
            max_alerts_per_run: 2,
            ..AlertConfig::default()
        };
        let manager = AlertManager::new(config);
        let anomalies = vec![
            traffic_drop_anomaly(),
            traffic_drop_anomaly(),
            traffic_drop_anomaly(),
        ];

        let alerts = manager.generate(&anomalies, &[]).await;
        assert_eq!(alerts.len(), 2);
    }

    #[tokio::test]
    async fn test_acknowledge_and_active_filtering() {
        let manager = AlertManager::default();
        let alerts = manager.generate(&[traffic_drop_anomaly()], &[]).await;
        let alert_id = alerts[0].id;

        assert_eq!(manager.active_alerts().await.len(), 1);

        assert!(manager.acknowledge(alert_id, "analyst").await);
        assert!(manager.active_alerts().await.is_empty());

        // 存在しないIDはfalse
        assert!(!manager.acknowledge(Uuid::new_v4(), "analyst").await);
        assert_eq!(manager.history_count().await, 1);
    }

    #[tokio::test]
    async fn test_clear_expired_removes_old_alerts() {
        let config = AlertConfig {
            alert_expiration_hours: -1,
            ..AlertConfig::default()
        };
        let manager = AlertManager::new(config);
        manager.generate(&[traffic_drop_anomaly()], &[]).await;

        assert_eq!(manager.clear_expired().await, 1);
        assert_eq!(manager.history_count().await, 0);
    }
}
