//! SEOメトリクス型定義

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 監視対象のSEOメトリクス種別
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// オーガニックトラフィック（セッション数/日）
    OrganicTraffic,
    /// キーワード順位（平均掲載順位）
    KeywordRanking,
    /// 検索結果の表示回数
    Impressions,
    /// クリック数
    Clicks,
    /// クリック率
    Ctr,
    /// 直帰率
    BounceRate,
    /// 平均セッション時間（秒）
    AvgSessionDuration,
    /// セッションあたりのページ数
    PagesPerSession,
}

impl MetricType {
    /// 全メトリクス
    pub const ALL: [MetricType; 8] = [
        MetricType::OrganicTraffic,
        MetricType::KeywordRanking,
        MetricType::Impressions,
        MetricType::Clicks,
        MetricType::Ctr,
        MetricType::BounceRate,
        MetricType::AvgSessionDuration,
        MetricType::PagesPerSession,
    ];

    /// 予測対象のトラフィック系メトリクス
    pub const FORECASTABLE: [MetricType; 3] = [
        MetricType::OrganicTraffic,
        MetricType::Impressions,
        MetricType::Clicks,
    ];

    /// ワイヤ名を取得
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrganicTraffic => "organic_traffic",
            Self::KeywordRanking => "keyword_ranking",
            Self::Impressions => "impressions",
            Self::Clicks => "clicks",
            Self::Ctr => "ctr",
            Self::BounceRate => "bounce_rate",
            Self::AvgSessionDuration => "avg_session_duration",
            Self::PagesPerSession => "pages_per_session",
        }
    }

    /// アラートタイトル用の表示名を取得
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OrganicTraffic => "Organic Traffic",
            Self::KeywordRanking => "Keyword Ranking",
            Self::Impressions => "Impressions",
            Self::Clicks => "Clicks",
            Self::Ctr => "Ctr",
            Self::BounceRate => "Bounce Rate",
            Self::AvgSessionDuration => "Avg Session Duration",
            Self::PagesPerSession => "Pages Per Session",
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// メトリクスの1日分のデータポイント
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// 日付
    pub date: NaiveDate,
    /// 値
    pub value: f64,
}

impl MetricPoint {
    /// 新しいデータポイントを作成
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// 分析対象の日付範囲（両端含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// 開始日
    pub start: NaiveDate,
    /// 終了日
    pub end: NaiveDate,
}

impl DateRange {
    /// 日付範囲を作成（終了日は開始日以降であること）
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// デシリアライズ済みの範囲を検証する
    pub fn validate(&self) -> Result<()> {
        if self.end < self.start {
            return Err(Error::InvalidInput(format!(
                "end date {} is before start date {}",
                self.end, self.start
            )));
        }
        Ok(())
    }

    /// 終了日から遡ってn日分の範囲を作成
    pub fn trailing_days(end: NaiveDate, days: u32) -> Self {
        let span = days.saturating_sub(1) as i64;
        Self {
            start: end - chrono::Duration::days(span),
            end,
        }
    }

    /// 範囲内の日数
    pub fn len_days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }

    /// 範囲内の全日付を順に返す
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.len_days() as usize)
    }
}

/// 週末判定（土日）
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// サイト×メトリクス×ディメンションの時系列データ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// 対象サイト
    pub site_id: String,
    /// メトリクス種別
    pub metric: MetricType,
    /// ディメンション（キーワードやページURLなど）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// 日付昇順・日付重複なしのデータポイント
    pub points: Vec<MetricPoint>,
}

impl TimeSeries {
    /// 空の時系列を作成
    pub fn new(site_id: impl Into<String>, metric: MetricType, dimension: Option<String>) -> Self {
        Self {
            site_id: site_id.into(),
            metric,
            dimension,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 日付順の値リスト
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// 最新のデータポイント
    pub fn latest(&self) -> Option<&MetricPoint> {
        self.points.last()
    }
}

/// 追跡キーワードの順位データ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRankingData {
    /// キーワード
    pub keyword: String,
    /// 現在の掲載順位
    pub current_position: u32,
    /// 前回の掲載順位
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_position: Option<u32>,
    /// 観測期間のベスト順位
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_position: Option<u32>,
    /// 観測期間のワースト順位
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_position: Option<u32>,
    /// ランクインしているURL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 観測日
    pub date: NaiveDate,
}

impl KeywordRankingData {
    /// 順位変動（負なら改善）
    pub fn position_change(&self) -> Option<i32> {
        self.previous_position
            .map(|prev| self.current_position as i32 - prev as i32)
    }
}

/// 監視タスクの入力
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringTask {
    pub id: Uuid,
    /// 対象サイト
    pub site_id: String,
    /// 分析対象期間
    pub date_range: DateRange,
    /// 監視対象メトリクス
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricType>,
    /// 順位を追跡するキーワード
    #[serde(default)]
    pub tracked_keywords: Vec<String>,
    /// 追跡ディメンション（ページURLなど）
    #[serde(default)]
    pub dimension: Option<String>,
    /// ベースライン日数
    #[serde(default = "default_baseline_days")]
    pub baseline_days: u32,
    /// 異常検知のZスコア閾値
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// 検知に必要な最小データ点数
    #[serde(default = "default_min_data_points")]
    pub min_data_points: usize,
    /// 予測を有効化
    #[serde(default = "default_true")]
    pub enable_forecasting: bool,
    /// 予測ホライズン（日数）
    #[serde(default = "default_forecast_days")]
    pub forecast_days: Vec<u32>,
    /// 予測アラートの減少率閾値（%）
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold_percent: f64,
}

fn default_metrics() -> Vec<MetricType> {
    vec![
        MetricType::OrganicTraffic,
        MetricType::KeywordRanking,
        MetricType::Ctr,
        MetricType::Impressions,
    ]
}

fn default_baseline_days() -> u32 {
    30
}

fn default_sensitivity() -> f64 {
    2.0
}

fn default_min_data_points() -> usize {
    7
}

fn default_true() -> bool {
    true
}

fn default_forecast_days() -> Vec<u32> {
    vec![30, 60, 90]
}

fn default_alert_threshold() -> f64 {
    10.0
}

impl MonitoringTask {
    /// 既定値でタスクを作成（終了日から60日分を分析対象とする）
    pub fn new(site_id: impl Into<String>, end_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            site_id: site_id.into(),
            date_range: DateRange::trailing_days(end_date, 60),
            metrics: default_metrics(),
            tracked_keywords: Vec::new(),
            dimension: None,
            baseline_days: default_baseline_days(),
            sensitivity: default_sensitivity(),
            min_data_points: default_min_data_points(),
            enable_forecasting: default_true(),
            forecast_days: default_forecast_days(),
            alert_threshold_percent: default_alert_threshold(),
        }
    }
}
