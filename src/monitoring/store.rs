//! 時系列データストア

use crate::monitoring::types::{MetricPoint, MetricType, TimeSeries};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// 時系列の識別キー
type SeriesKey = (String, MetricType, Option<String>);

/// サイト×メトリクス×ディメンション単位のインメモリ時系列ストア
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesStore {
    series: Arc<RwLock<HashMap<SeriesKey, TimeSeries>>>,
}

impl TimeSeriesStore {
    /// 新しいストアを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// データポイントを取り込む（同一日付は後勝ちで上書き、日付昇順を維持）
    pub async fn append(
        &self,
        site_id: &str,
        metric: MetricType,
        dimension: Option<String>,
        points: Vec<MetricPoint>,
    ) -> usize {
        if points.is_empty() {
            return 0;
        }
        let key = (site_id.to_string(), metric, dimension.clone());
        let mut series = self.series.write().await;
        let entry = series
            .entry(key)
            .or_insert_with(|| TimeSeries::new(site_id, metric, dimension));

        let mut by_date: HashMap<chrono::NaiveDate, f64> =
            entry.points.iter().map(|p| (p.date, p.value)).collect();
        for point in &points {
            by_date.insert(point.date, point.value);
        }
        let mut merged: Vec<MetricPoint> = by_date
            .into_iter()
            .map(|(date, value)| MetricPoint::new(date, value))
            .collect();
        merged.sort_by_key(|p| p.date);

        debug!(
            site_id = %entry.site_id,
            metric = %entry.metric,
            appended = points.len(),
            total = merged.len(),
            "appended metric points"
        );
        entry.points = merged;
        entry.points.len()
    }

    /// 時系列を取得
    pub async fn get(
        &self,
        site_id: &str,
        metric: MetricType,
        dimension: Option<&str>,
    ) -> Option<TimeSeries> {
        let key = (
            site_id.to_string(),
            metric,
            dimension.map(|d| d.to_string()),
        );
        self.series.read().await.get(&key).cloned()
    }

    /// サイト配下の全時系列を取得
    pub async fn series_for_site(&self, site_id: &str) -> Vec<TimeSeries> {
        let series = self.series.read().await;
        let mut found: Vec<TimeSeries> = series
            .values()
            .filter(|s| s.site_id == site_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.metric
                .name()
                .cmp(b.metric.name())
                .then_with(|| a.dimension.cmp(&b.dimension))
        });
        found
    }

    /// 保持している時系列の本数
    pub async fn series_count(&self) -> usize {
        self.series.read().await.len()
    }

    /// 全データを破棄
    pub async fn clear(&self) {
        self.series.write().await.clear();
    }
}
