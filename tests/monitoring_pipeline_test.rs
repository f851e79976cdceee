//! 監視パイプラインの統合テスト

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use seo_workers_rs::analytics::{AnomalyConfig, AnomalyKind, ForecastConfig};
use seo_workers_rs::monitoring::{
    AlertConfig, AlertPriority, DataSource, DateRange, IngestionService, KeywordRankingData,
    MetricPoint, MetricType, MonitoringRunner, MonitoringTask, ReportStatus, TimeSeries,
};
use seo_workers_rs::Result;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 最終日に急落を注入するテスト用ソース
struct DropSource;

#[async_trait]
impl DataSource for DropSource {
    fn name(&self) -> &'static str {
        "ga"
    }

    async fn fetch_time_series(
        &self,
        site_id: &str,
        metric: MetricType,
        date_range: DateRange,
        dimension: Option<&str>,
    ) -> Result<TimeSeries> {
        let mut series = TimeSeries::new(site_id, metric, dimension.map(String::from));
        let days: Vec<NaiveDate> = date_range.iter_days().collect();
        for (i, day) in days.iter().enumerate() {
            let value = if i + 1 == days.len() {
                400.0
            } else {
                1000.0 + (i % 5) as f64 * 10.0
            };
            series.points.push(MetricPoint::new(*day, value));
        }
        Ok(series)
    }

    async fn fetch_keyword_rankings(
        &self,
        _site_id: &str,
        _keywords: &[String],
        _target_date: NaiveDate,
    ) -> Result<Vec<KeywordRankingData>> {
        Ok(Vec::new())
    }
}

fn drop_runner() -> MonitoringRunner {
    MonitoringRunner::new(
        IngestionService::new(vec![Arc::new(DropSource)]),
        AnomalyConfig::default(),
        ForecastConfig::default(),
        AlertConfig::default(),
    )
}

#[tokio::test]
async fn test_monitoring_run_with_mock_sources() {
    let runner = MonitoringRunner::with_mock_sources(42);
    let task = MonitoringTask::new("site-1", date(2025, 4, 30));

    let report = runner.run(&task).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert!(report.error.is_none());
    assert!(report.warnings.is_empty());

    // 既定タスクは60日分のデータを取得する
    assert_eq!(report.data_summary.get("organic_traffic"), Some(&60));
    assert_eq!(report.data_summary.get("impressions"), Some(&60));
    assert!(report.health_score.is_some());

    // 予測対象はオーガニックトラフィックとインプレッションの2系列
    assert_eq!(report.forecasts.len(), 2);

    // ストアにも保存される
    let series = runner
        .store()
        .get("site-1", MetricType::OrganicTraffic, None)
        .await;
    assert_eq!(series.unwrap().len(), 60);
}

#[tokio::test]
async fn test_forecast_points_are_internally_consistent() {
    let runner = MonitoringRunner::with_mock_sources(7);
    let task = MonitoringTask::new("site-fc", date(2025, 4, 30));

    let report = runner.run(&task).await;
    assert!(!report.forecasts.is_empty());

    for forecast in &report.forecasts {
        // 予測値は常に信頼区間の内側にある
        for point in &forecast.daily_forecasts {
            assert!(point.lower_bound <= point.predicted_value);
            assert!(point.predicted_value <= point.upper_bound);
        }
        // 信頼度はホライズンが延びるほど下がる
        assert!(forecast.forecast_30d.confidence >= forecast.forecast_60d.confidence);
        assert!(forecast.forecast_60d.confidence >= forecast.forecast_90d.confidence);
        assert!(forecast.trend_strength >= 0.0 && forecast.trend_strength <= 1.0);
    }
}

#[tokio::test]
async fn test_tracked_keyword_rankings_in_report() {
    let runner = MonitoringRunner::with_mock_sources(42);
    let mut task = MonitoringTask::new("site-kw", date(2025, 4, 30));
    task.tracked_keywords = vec!["running shoes".to_string(), "trail boots".to_string()];

    let report = runner.run(&task).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.keyword_rankings.len(), 2);
    for ranking in &report.keyword_rankings {
        assert!(ranking.current_position >= 1);
        assert_eq!(ranking.date, date(2025, 4, 30));
    }
}

#[tokio::test]
async fn test_injected_drop_detected_with_actionable_alerts() {
    let runner = drop_runner();
    let mut task = MonitoringTask::new("site-drop", date(2025, 4, 30));
    task.metrics = vec![MetricType::OrganicTraffic];
    task.enable_forecasting = false;

    let report = runner.run(&task).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert!(report
        .anomalies
        .iter()
        .any(|a| a.kind == AnomalyKind::SuddenDrop));

    assert!(!report.alerts.is_empty());
    assert!(report.has_critical_alerts());

    // アラートは優先度順に並ぶ
    for pair in report.alerts.windows(2) {
        assert!(pair[0].priority.sort_order() <= pair[1].priority.sort_order());
    }

    // 調査手順は1始まりの連番
    let top = &report.alerts[0];
    assert!(matches!(
        top.priority,
        AlertPriority::Critical | AlertPriority::Urgent
    ));
    assert!(!top.investigation_steps.is_empty());
    for (i, step) in top.investigation_steps.iter().enumerate() {
        assert_eq!(step.order, (i + 1) as u32);
        assert!(!step.action.is_empty());
    }
    assert!(!top.recommended_actions.is_empty());

    // トラフィック急落は健全性スコアに反映される
    let health = report.health_score.unwrap();
    assert!(health.traffic_health < 100.0);
    assert!(health.overall < 100.0);
}

#[tokio::test]
async fn test_acknowledge_removes_alert_from_active_set() {
    let runner = drop_runner();
    let mut task = MonitoringTask::new("site-ack", date(2025, 4, 30));
    task.metrics = vec![MetricType::OrganicTraffic];
    task.enable_forecasting = false;

    let report = runner.run(&task).await;
    assert!(!report.alerts.is_empty());

    let manager = runner.alert_manager();
    let active_before = manager.active_alerts().await;
    assert!(!active_before.is_empty());

    let target = active_before[0].id;
    assert!(manager.acknowledge(target, "ops-team").await);

    let active_after = manager.active_alerts().await;
    assert!(active_after.iter().all(|a| a.id != target));

    // 存在しないIDは失敗
    assert!(!manager.acknowledge(uuid::Uuid::new_v4(), "ops-team").await);
}

#[tokio::test]
async fn test_inverted_date_range_yields_failed_report() {
    let runner = MonitoringRunner::with_mock_sources(42);
    let mut task = MonitoringTask::new("site-bad", date(2025, 4, 30));
    task.date_range = DateRange {
        start: date(2025, 4, 30),
        end: date(2025, 4, 1),
    };

    let report = runner.run(&task).await;

    assert_eq!(report.status, ReportStatus::Failed);
    let error = report.error.unwrap();
    assert!(error.contains("before start"));
    assert!(report.health_score.is_none());
    assert!(report.alerts.is_empty());
}

#[tokio::test]
async fn test_missing_source_produces_warnings_not_failure() {
    // GSC系メトリクスを扱うソースがない構成
    let runner = MonitoringRunner::new(
        IngestionService::new(vec![Arc::new(DropSource)]),
        AnomalyConfig::default(),
        ForecastConfig::default(),
        AlertConfig::default(),
    );
    let mut task = MonitoringTask::new("site-partial", date(2025, 4, 30));
    task.metrics = vec![MetricType::OrganicTraffic, MetricType::Impressions];
    task.enable_forecasting = false;

    let report = runner.run(&task).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert!(report.data_summary.contains_key("organic_traffic"));
    assert!(!report.data_summary.contains_key("impressions"));
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("impressions")));
}
