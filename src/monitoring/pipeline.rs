//! 監視パイプライン
//!
//! データ取り込み、異常検知、トラフィック予測、アラート生成、
//! 健全性評価を1回の監視実行として編成する。

use crate::analytics::anomaly::{Anomaly, AnomalyConfig, AnomalyDetector};
use crate::analytics::forecast::{Forecast, ForecastConfig, TrafficForecaster};
use crate::error::Result;
use crate::monitoring::alerts::{Alert, AlertConfig, AlertManager, AlertPriority};
use crate::monitoring::health::{calculate_health_score, HealthScore};
use crate::monitoring::sources::IngestionService;
use crate::monitoring::store::TimeSeriesStore;
use crate::monitoring::types::{KeywordRankingData, MetricType, MonitoringTask};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// ボラティリティ判定に使う直近窓の日数
const VOLATILITY_WINDOW_DAYS: usize = 7;

/// 監視実行の終了ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// 正常終了
    Completed,
    /// 実行失敗
    Failed,
}

impl ReportStatus {
    /// ステータス名を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// 監視実行の結果レポート
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringReport {
    /// 実行したタスクのID
    pub task_id: Uuid,
    /// 終了ステータス
    pub status: ReportStatus,
    /// メトリクス名→取り込んだデータ点数
    #[serde(default)]
    pub data_summary: HashMap<String, usize>,
    /// 検知された異常
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    /// 生成された予測
    #[serde(default)]
    pub forecasts: Vec<Forecast>,
    /// 生成されたアラート
    #[serde(default)]
    pub alerts: Vec<Alert>,
    /// サイト健全性スコア
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_score: Option<HealthScore>,
    /// 追跡キーワードの順位
    #[serde(default)]
    pub keyword_rankings: Vec<KeywordRankingData>,
    /// 処理完了時刻
    pub processed_at: DateTime<Utc>,
    /// 処理時間（ミリ秒）
    pub processing_time_ms: u64,
    /// 失敗時のエラー内容
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 取得できなかったメトリクスなどの警告
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl MonitoringReport {
    /// Critical優先度のアラートを含むか
    pub fn has_critical_alerts(&self) -> bool {
        self.alerts
            .iter()
            .any(|a| a.priority == AlertPriority::Critical)
    }

    fn failed(task_id: Uuid, error: String, processing_time_ms: u64) -> Self {
        Self {
            task_id,
            status: ReportStatus::Failed,
            data_summary: HashMap::new(),
            anomalies: Vec::new(),
            forecasts: Vec::new(),
            alerts: Vec::new(),
            health_score: None,
            keyword_rankings: Vec::new(),
            processed_at: Utc::now(),
            processing_time_ms,
            error: Some(error),
            warnings: Vec::new(),
        }
    }
}

/// 監視パイプラインの実行器
pub struct MonitoringRunner {
    ingestion: IngestionService,
    store: TimeSeriesStore,
    detector: AnomalyDetector,
    forecaster: TrafficForecaster,
    alert_manager: AlertManager,
}

impl MonitoringRunner {
    /// 取り込みサービスと各種設定から実行器を作成
    pub fn new(
        ingestion: IngestionService,
        anomaly_config: AnomalyConfig,
        forecast_config: ForecastConfig,
        alert_config: AlertConfig,
    ) -> Self {
        Self {
            ingestion,
            store: TimeSeriesStore::default(),
            detector: AnomalyDetector::new(anomaly_config),
            forecaster: TrafficForecaster::new(forecast_config),
            alert_manager: AlertManager::new(alert_config),
        }
    }

    /// モックソースとデフォルト設定の実行器（開発・テスト用）
    pub fn with_mock_sources(base_seed: u64) -> Self {
        Self::new(
            IngestionService::with_mock_sources(base_seed),
            AnomalyConfig::default(),
            ForecastConfig::default(),
            AlertConfig::default(),
        )
    }

    /// 内部の時系列ストアへの参照
    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    /// 内部のアラートマネージャーへの参照
    pub fn alert_manager(&self) -> &AlertManager {
        &self.alert_manager
    }

    /// 監視タスクを実行してレポートを返す
    ///
    /// 実行中のエラーはFailedステータスのレポートに変換する。
    pub async fn run(&self, task: &MonitoringTask) -> MonitoringReport {
        let started = Instant::now();
        info!(
            task_id = %task.id,
            site = %task.site_id,
            start = %task.date_range.start,
            end = %task.date_range.end,
            "monitoring run started"
        );

        match self.execute(task).await {
            Ok(mut report) => {
                report.processing_time_ms = started.elapsed().as_millis() as u64;
                info!(
                    task_id = %task.id,
                    anomalies = report.anomalies.len(),
                    forecasts = report.forecasts.len(),
                    alerts = report.alerts.len(),
                    health = report.health_score.as_ref().map(|h| h.overall),
                    elapsed_ms = report.processing_time_ms,
                    "monitoring run completed"
                );
                report
            }
            Err(err) => {
                error!(task_id = %task.id, error = %err, "monitoring run failed");
                MonitoringReport::failed(
                    task.id,
                    err.to_string(),
                    started.elapsed().as_millis() as u64,
                )
            }
        }
    }

    async fn execute(&self, task: &MonitoringTask) -> Result<MonitoringReport> {
        task.date_range.validate()?;

        let mut data_summary: HashMap<String, usize> = HashMap::new();
        let mut warnings: Vec<String> = Vec::new();

        // 取り込み
        let fetched = self
            .ingestion
            .fetch_all_metrics(
                &task.site_id,
                &task.metrics,
                task.date_range,
                task.dimension.as_deref(),
            )
            .await;
        for metric in &task.metrics {
            match fetched.get(metric) {
                Some(series) => {
                    let stored = self
                        .store
                        .append(
                            &task.site_id,
                            *metric,
                            task.dimension.clone(),
                            series.points.clone(),
                        )
                        .await;
                    data_summary.insert(metric.name().to_string(), stored);
                }
                None => warnings.push(format!("no data available for {}", metric.name())),
            }
        }

        let keyword_rankings = if task.tracked_keywords.is_empty() {
            Vec::new()
        } else {
            let rankings = self
                .ingestion
                .fetch_keyword_rankings(&task.site_id, &task.tracked_keywords, task.date_range.end)
                .await;
            data_summary.insert("keyword_rankings".to_string(), rankings.len());
            rankings
        };

        // 異常検知
        let mut anomalies: Vec<Anomaly> = Vec::new();
        for metric in &task.metrics {
            let Some(series) = self
                .store
                .get(&task.site_id, *metric, task.dimension.as_deref())
                .await
            else {
                continue;
            };
            anomalies.extend(self.detector.detect(&series, task.sensitivity));
            if let Some(volatility) = self
                .detector
                .detect_volatility(&series, VOLATILITY_WINDOW_DAYS)
            {
                anomalies.push(volatility);
            }
        }
        debug!(count = anomalies.len(), "anomaly detection finished");

        // トラフィック予測
        let mut forecasts: Vec<Forecast> = Vec::new();
        if task.enable_forecasting {
            for metric in MetricType::FORECASTABLE {
                if !task.metrics.contains(&metric) {
                    continue;
                }
                let Some(series) = self
                    .store
                    .get(&task.site_id, metric, task.dimension.as_deref())
                    .await
                else {
                    continue;
                };
                if let Some(forecast) = self.forecaster.forecast(&series, &task.forecast_days) {
                    forecasts.push(forecast);
                }
            }
        }
        debug!(count = forecasts.len(), "forecasting finished");

        let alerts = self.alert_manager.generate(&anomalies, &forecasts).await;
        let health_score = calculate_health_score(&anomalies, &forecasts);

        Ok(MonitoringReport {
            task_id: task.id,
            status: ReportStatus::Completed,
            data_summary,
            anomalies,
            forecasts,
            alerts,
            health_score: Some(health_score),
            keyword_rankings,
            processed_at: Utc::now(),
            processing_time_ms: 0,
            error: None,
            warnings,
        })
    }
}
