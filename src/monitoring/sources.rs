//! モニタリングデータソース
//!
//! GSC/GA相当のモックソースと、メトリクス別ルーティングを行う
//! 取り込みサービス。モックは決定的な擬似データを生成する。

use crate::analytics::stats::round_to;
use crate::error::Result;
use crate::monitoring::types::{
    is_weekend, DateRange, KeywordRankingData, MetricPoint, MetricType, TimeSeries,
};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// SEOデータソースの抽象インターフェース
#[async_trait]
pub trait DataSource: Send + Sync {
    /// ソース名（ルーティングキー）
    fn name(&self) -> &'static str;

    /// 指定期間のメトリクス時系列を取得
    async fn fetch_time_series(
        &self,
        site_id: &str,
        metric: MetricType,
        date_range: DateRange,
        dimension: Option<&str>,
    ) -> Result<TimeSeries>;

    /// 指定日のキーワード順位を取得
    async fn fetch_keyword_rankings(
        &self,
        site_id: &str,
        keywords: &[String],
        target_date: NaiveDate,
    ) -> Result<Vec<KeywordRankingData>>;

    /// ソースの死活確認
    async fn health_check(&self) -> bool {
        true
    }
}

/// メトリクスを担当ソース名に対応付ける
pub fn preferred_source(metric: MetricType) -> &'static str {
    match metric {
        MetricType::KeywordRanking
        | MetricType::Impressions
        | MetricType::Ctr
        | MetricType::Clicks => "gsc",
        MetricType::OrganicTraffic
        | MetricType::BounceRate
        | MetricType::AvgSessionDuration
        | MetricType::PagesPerSession => "ga",
    }
}

/// キー文字列から決定的シードを導出
fn digest_seed(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// ディメンション文字列から倍率を導出（floor + 0.00..=0.99）
fn dimension_multiplier(dimension: &str, floor: f64) -> f64 {
    let digest = Sha256::digest(dimension.as_bytes());
    let mut bytes = [0u8; 2];
    bytes.copy_from_slice(&digest[..2]);
    floor + f64::from(u16::from_be_bytes(bytes) % 100) / 100.0
}

/// 注入する異常の向き
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedAnomaly {
    /// 急落
    Drop,
    /// 急騰
    Spike,
}

/// 注入するトレンドの形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedTrend {
    /// 日次減少
    Decline,
    /// 日次増加
    Growth,
    /// 横ばい
    Stable,
}

/// Search Console相当のモックソース
///
/// 月次の季節性、平日/週末効果、シード付きノイズで現実的な
/// 検索メトリクスを再現する。同一入力には常に同一の値を返す。
#[derive(Debug, Clone)]
pub struct MockSearchConsoleSource {
    base_seed: u64,
}

/// 月別の季節性倍率（1月始まり）
const GSC_SEASONALITY: [f64; 12] = [
    0.9, 0.95, 1.0, 1.05, 1.1, 1.05, 0.95, 0.9, 1.0, 1.1, 1.15, 1.0,
];

impl MockSearchConsoleSource {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    fn baseline(metric: MetricType) -> f64 {
        match metric {
            MetricType::Impressions => 10_000.0,
            MetricType::Clicks => 500.0,
            MetricType::Ctr => 0.05,
            MetricType::KeywordRanking => 15.0,
            _ => 100.0,
        }
    }

    fn generate_value(
        &self,
        site_id: &str,
        metric: MetricType,
        date: NaiveDate,
        dimension: Option<&str>,
    ) -> f64 {
        let key = format!("{site_id}:{}:{date}", metric.name());
        let mut rng = StdRng::seed_from_u64(self.base_seed.wrapping_add(digest_seed(&key)));

        let base = Self::baseline(metric);
        let seasonal = GSC_SEASONALITY[date.month0() as usize];
        let dow_mult = if is_weekend(date) { 0.7 } else { 1.0 };
        let noise = 1.0 + rng.gen_range(-0.15..=0.15);

        let mut value = base * seasonal * dow_mult * noise;

        if let Some(dim) = dimension {
            value *= dimension_multiplier(dim, 0.5);
        }

        match metric {
            MetricType::Ctr => value = value.clamp(0.01, 0.15),
            MetricType::KeywordRanking => value = value.round().clamp(1.0, 100.0),
            _ => {}
        }

        round_to(value, 4)
    }

    /// 検知テスト用に特定日へ異常を注入した時系列を生成
    pub fn series_with_anomaly(
        &self,
        site_id: &str,
        metric: MetricType,
        date_range: DateRange,
        anomaly_date: NaiveDate,
        magnitude: f64,
        direction: InjectedAnomaly,
    ) -> TimeSeries {
        let multiplier = match direction {
            InjectedAnomaly::Drop => 1.0 - magnitude,
            InjectedAnomaly::Spike => 1.0 + magnitude,
        };

        let points = date_range
            .iter_days()
            .map(|date| {
                let mut value = self.generate_value(site_id, metric, date, None);
                if date == anomaly_date {
                    value *= multiplier;
                }
                MetricPoint::new(date, value)
            })
            .collect();

        TimeSeries {
            site_id: site_id.to_string(),
            metric,
            dimension: None,
            points,
        }
    }
}

impl Default for MockSearchConsoleSource {
    fn default() -> Self {
        Self::new(42)
    }
}

#[async_trait]
impl DataSource for MockSearchConsoleSource {
    fn name(&self) -> &'static str {
        "gsc"
    }

    async fn fetch_time_series(
        &self,
        site_id: &str,
        metric: MetricType,
        date_range: DateRange,
        dimension: Option<&str>,
    ) -> Result<TimeSeries> {
        let points = date_range
            .iter_days()
            .map(|date| MetricPoint::new(date, self.generate_value(site_id, metric, date, dimension)))
            .collect();

        Ok(TimeSeries {
            site_id: site_id.to_string(),
            metric,
            dimension: dimension.map(String::from),
            points,
        })
    }

    async fn fetch_keyword_rankings(
        &self,
        site_id: &str,
        keywords: &[String],
        target_date: NaiveDate,
    ) -> Result<Vec<KeywordRankingData>> {
        let date_key = format!("{site_id}:{}:{target_date}", MetricType::KeywordRanking.name());
        let date_seed = self.base_seed.wrapping_add(digest_seed(&date_key));

        let rankings = keywords
            .iter()
            .map(|keyword| {
                let mut rng =
                    StdRng::seed_from_u64(date_seed.wrapping_add(digest_seed(keyword)));

                let current: u32 = rng.gen_range(1..=50);
                let movement: i32 = rng.gen_range(-5..=5);
                let previous = (current as i32 + movement).clamp(1, 100) as u32;
                let best = current.saturating_sub(rng.gen_range(0..=10)).max(1);
                let worst = (current + rng.gen_range(0..=20)).min(100);

                let slug = keyword.replace(' ', "-").to_lowercase();
                KeywordRankingData {
                    keyword: keyword.clone(),
                    current_position: current,
                    previous_position: Some(previous),
                    best_position: Some(best),
                    worst_position: Some(worst),
                    url: Some(format!("{site_id}/{slug}/")),
                    date: target_date,
                }
            })
            .collect();

        Ok(rankings)
    }
}

/// Analytics相当のモックソース
///
/// トラフィックとエンゲージメント系メトリクスを生成する。
/// 週末の落ち込みとノイズ幅がGSCモックより大きい。
#[derive(Debug, Clone)]
pub struct MockAnalyticsSource {
    base_seed: u64,
}

/// 月別の季節性倍率（1月始まり）
const GA_SEASONALITY: [f64; 12] = [
    0.85, 0.9, 0.95, 1.0, 1.05, 1.0, 0.9, 0.85, 1.0, 1.1, 1.15, 0.95,
];

impl MockAnalyticsSource {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    fn baseline(metric: MetricType) -> f64 {
        match metric {
            MetricType::OrganicTraffic => 2000.0,
            MetricType::BounceRate => 0.55,
            MetricType::AvgSessionDuration => 180.0,
            MetricType::PagesPerSession => 2.5,
            _ => 100.0,
        }
    }

    fn generate_value(
        &self,
        site_id: &str,
        metric: MetricType,
        date: NaiveDate,
        dimension: Option<&str>,
    ) -> f64 {
        let key = format!("{site_id}:ga:{}:{date}", metric.name());
        let mut rng = StdRng::seed_from_u64(self.base_seed.wrapping_add(digest_seed(&key)));

        let base = Self::baseline(metric);
        let seasonal = GA_SEASONALITY[date.month0() as usize];
        let dow_mult = if is_weekend(date) { 0.6 } else { 1.0 };
        let noise = 1.0 + rng.gen_range(-0.2..=0.2);

        let mut value = base * seasonal * dow_mult * noise;

        if let Some(dim) = dimension {
            value *= dimension_multiplier(dim, 0.3);
        }

        match metric {
            MetricType::BounceRate => value = value.clamp(0.2, 0.9),
            MetricType::PagesPerSession => value = value.clamp(1.0, 10.0),
            MetricType::AvgSessionDuration => value = value.max(30.0),
            MetricType::OrganicTraffic => value = value.max(0.0),
            _ => {}
        }

        round_to(value, 4)
    }

    /// トレンド検証用に傾きを乗せたトラフィック系列を生成
    pub fn series_with_trend(
        &self,
        site_id: &str,
        date_range: DateRange,
        trend: InjectedTrend,
        daily_rate: f64,
    ) -> TimeSeries {
        let points = date_range
            .iter_days()
            .enumerate()
            .map(|(day, date)| {
                let base = self.generate_value(site_id, MetricType::OrganicTraffic, date, None);
                let trend_mult = match trend {
                    InjectedTrend::Decline => 1.0 - daily_rate * day as f64,
                    InjectedTrend::Growth => 1.0 + daily_rate * day as f64,
                    InjectedTrend::Stable => 1.0,
                };
                MetricPoint::new(date, base * trend_mult.max(0.1))
            })
            .collect();

        TimeSeries {
            site_id: site_id.to_string(),
            metric: MetricType::OrganicTraffic,
            dimension: None,
            points,
        }
    }
}

impl Default for MockAnalyticsSource {
    fn default() -> Self {
        Self::new(42)
    }
}

#[async_trait]
impl DataSource for MockAnalyticsSource {
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
        let points = date_range
            .iter_days()
            .map(|date| MetricPoint::new(date, self.generate_value(site_id, metric, date, dimension)))
            .collect();

        Ok(TimeSeries {
            site_id: site_id.to_string(),
            metric,
            dimension: dimension.map(String::from),
            points,
        })
    }

    /// 順位データは検索コンソール側の担当のため常に空
    async fn fetch_keyword_rankings(
        &self,
        _site_id: &str,
        _keywords: &[String],
        _target_date: NaiveDate,
    ) -> Result<Vec<KeywordRankingData>> {
        Ok(Vec::new())
    }
}

/// 複数ソースからの取り込みを束ねるサービス
///
/// メトリクスごとに担当ソースへルーティングし、個別の取得失敗は
/// ログに残してスキップする（実行全体は失敗させない）。
pub struct IngestionService {
    sources: HashMap<&'static str, Arc<dyn DataSource>>,
}

impl IngestionService {
    /// ソース群からサービスを構築
    pub fn new(sources: Vec<Arc<dyn DataSource>>) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.name(), source))
            .collect();
        Self { sources }
    }

    /// モックソース構成（開発・テスト用）
    pub fn with_mock_sources(base_seed: u64) -> Self {
        Self::new(vec![
            Arc::new(MockSearchConsoleSource::new(base_seed)),
            Arc::new(MockAnalyticsSource::new(base_seed)),
        ])
    }

    /// 名前でソースを取得
    pub fn get_source(&self, name: &str) -> Option<&Arc<dyn DataSource>> {
        self.sources.get(name)
    }

    /// 指定ソースから1メトリクスを取得（失敗はNone）
    pub async fn fetch_metric(
        &self,
        source_name: &str,
        site_id: &str,
        metric: MetricType,
        date_range: DateRange,
        dimension: Option<&str>,
    ) -> Option<TimeSeries> {
        let Some(source) = self.sources.get(source_name) else {
            warn!(source_name, "data source not found");
            return None;
        };

        match source
            .fetch_time_series(site_id, metric, date_range, dimension)
            .await
        {
            Ok(series) => {
                info!(
                    source = source_name,
                    metric = %metric,
                    data_points = series.len(),
                    "metric fetched"
                );
                Some(series)
            }
            Err(err) => {
                error!(
                    source = source_name,
                    metric = %metric,
                    error = %err,
                    "failed to fetch metric"
                );
                None
            }
        }
    }

    /// 監視対象メトリクスを担当ソースから一括取得
    pub async fn fetch_all_metrics(
        &self,
        site_id: &str,
        metrics: &[MetricType],
        date_range: DateRange,
        dimension: Option<&str>,
    ) -> HashMap<MetricType, TimeSeries> {
        let mut results = HashMap::new();

        for metric in metrics {
            let source_name = preferred_source(*metric);
            if let Some(series) = self
                .fetch_metric(source_name, site_id, *metric, date_range, dimension)
                .await
            {
                results.insert(*metric, series);
            }
        }

        info!(
            requested = metrics.len(),
            successful = results.len(),
            "fetched all metrics"
        );
        results
    }

    /// キーワード順位を検索コンソールソースから取得（失敗は空）
    pub async fn fetch_keyword_rankings(
        &self,
        site_id: &str,
        keywords: &[String],
        target_date: NaiveDate,
    ) -> Vec<KeywordRankingData> {
        let Some(source) = self.sources.get("gsc") else {
            warn!("gsc source not available for keyword rankings");
            return Vec::new();
        };

        match source
            .fetch_keyword_rankings(site_id, keywords, target_date)
            .await
        {
            Ok(rankings) => {
                info!(
                    keywords_count = keywords.len(),
                    rankings_count = rankings.len(),
                    "keyword rankings fetched"
                );
                rankings
            }
            Err(err) => {
                error!(error = %err, "failed to fetch keyword rankings");
                Vec::new()
            }
        }
    }
}
