//! SEOサイト監視システム
//!
//! このモジュールは、検索パフォーマンスデータの取り込み、
//! 異常検知と予測の実行、アラート生成、健全性評価を提供します。

pub mod alerts;
pub mod health;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod types;

pub use alerts::{Alert, AlertConfig, AlertManager, AlertPriority, InvestigationStep};
pub use health::{calculate_health_score, HealthScore};
pub use pipeline::{MonitoringReport, MonitoringRunner, ReportStatus};
pub use sources::{DataSource, IngestionService, MockAnalyticsSource, MockSearchConsoleSource};
pub use store::TimeSeriesStore;
pub use types::{
    DateRange, KeywordRankingData, MetricPoint, MetricType, MonitoringTask, TimeSeries,
};
