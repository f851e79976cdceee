//! Traffic Forecaster
//!
//! 説明可能な統計手法によるメトリクス予測
//!
//! 移動平均・線形回帰・指数加重平均と、それらの信頼度加重
//! アンサンブルを実装する。全手法が追跡可能で、ブラックボックスの
//! 機械学習は使わない。

use crate::analytics::forecast::trend::classify_trend;
use crate::analytics::forecast::types::{
    Forecast, ForecastConfig, ForecastMethod, ForecastPoint, TrendDirection,
};
use crate::analytics::stats;
use crate::monitoring::types::TimeSeries;
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// 95%信頼区間のZ値
const INTERVAL_Z: f64 = 1.96;

/// 指数平滑化の平滑化係数
const EMA_ALPHA: f64 = 0.3;

/// バックテストで検証に使う日数
const BACKTEST_DAYS: usize = 7;

/// 単一手法の1日分予測
#[derive(Debug, Clone, Copy)]
struct MethodForecast {
    predicted: f64,
    lower: f64,
    upper: f64,
    confidence: f64,
}

/// 時系列予測器
#[derive(Debug, Clone)]
pub struct TrafficForecaster {
    config: ForecastConfig,
}

impl TrafficForecaster {
    /// 設定から予測器を作成
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// 時系列から日次予測とホライズン別予測を生成する
    ///
    /// データ点数が不足する場合はNoneを返す。horizonsの最大値まで
    /// 1日刻みで予測し、30/60/90日地点を代表値として抜き出す。
    pub fn forecast(&self, series: &TimeSeries, horizons: &[u32]) -> Option<Forecast> {
        let values = series.values();

        if values.len() < self.config.min_data_points {
            warn!(
                metric = %series.metric,
                required = self.config.min_data_points,
                actual = values.len(),
                "insufficient data for forecasting"
            );
            return None;
        }

        let method = if self.config.use_ensemble {
            ForecastMethod::Ensemble
        } else {
            ForecastMethod::MovingAverage
        };

        let last_date = series.latest()?.date;
        let max_horizon = horizons.iter().copied().max().unwrap_or(30).max(1);

        let mut daily_forecasts = Vec::with_capacity(max_horizon as usize);
        for day in 1..=max_horizon {
            let mf = match method {
                ForecastMethod::Ensemble => self.ensemble(&values, day),
                _ => self.moving_average(&values, day),
            };

            // 予測値が負に振れても下限・上限との順序を崩さない
            let predicted = mf.predicted.max(mf.lower);
            let upper = mf.upper.max(predicted);

            daily_forecasts.push(ForecastPoint {
                date: last_date + Duration::days(day as i64),
                predicted_value: stats::round_to(predicted, 2),
                lower_bound: stats::round_to(mf.lower, 2),
                upper_bound: stats::round_to(upper, 2),
                confidence: stats::round_to(mf.confidence, 3),
            });
        }

        let (trend_direction, trend_strength) = classify_trend(&values);
        let accuracy = self.backtest_accuracy(&values);
        let explanation = build_explanation(trend_direction, trend_strength, method, &values);
        let factors = identify_factors(&values, trend_direction);

        let forecast = Forecast {
            id: Uuid::new_v4(),
            metric: series.metric,
            dimension: series.dimension.clone(),
            method,
            forecast_30d: horizon_point(&daily_forecasts, 30),
            forecast_60d: horizon_point(&daily_forecasts, 60),
            forecast_90d: horizon_point(&daily_forecasts, 90),
            daily_forecasts,
            model_accuracy: accuracy,
            trend_direction,
            trend_strength,
            explanation,
            factors,
            generated_at: Utc::now(),
        };

        info!(
            metric = %series.metric,
            method = method.as_str(),
            trend = trend_direction.as_str(),
            accuracy = ?accuracy,
            "forecast generated"
        );

        Some(forecast)
    }

    /// 移動平均予測
    ///
    /// 直近ウィンドウの平均を予測値とし、信頼度は1日あたり0.5%減衰
    /// （下限0.5）、区間幅は1日あたり1%拡大する。
    fn moving_average(&self, values: &[f64], days_ahead: u32) -> MethodForecast {
        let window = self.config.ma_window.min(values.len());
        let recent = &values[values.len() - window..];

        let ma = stats::mean(recent);
        let stdev = stats::sample_stdev(recent);

        let confidence = (0.9 - 0.005 * days_ahead as f64).max(0.5);
        let interval = INTERVAL_Z * stdev * (1.0 + 0.01 * days_ahead as f64);

        MethodForecast {
            predicted: ma,
            lower: (ma - interval).max(0.0),
            upper: ma + interval,
            confidence,
        }
    }

    /// 線形回帰予測
    ///
    /// 最小二乗法でトレンド直線を当てはめ、決定係数から信頼度を導く。
    /// 区間は残差標準誤差から1日あたり2%拡大する。
    fn linear_trend(&self, values: &[f64], days_ahead: u32) -> MethodForecast {
        let n = values.len();
        let x_mean = (n - 1) as f64 / 2.0;
        let y_mean = stats::mean(values);

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, value) in values.iter().enumerate() {
            let x_diff = i as f64 - x_mean;
            numerator += x_diff * (value - y_mean);
            denominator += x_diff * x_diff;
        }

        if denominator == 0.0 {
            return MethodForecast {
                predicted: y_mean,
                lower: y_mean * 0.8,
                upper: y_mean * 1.2,
                confidence: 0.5,
            };
        }

        let slope = numerator / denominator;
        let intercept = y_mean - slope * x_mean;

        let future_x = (n as u32 + days_ahead - 1) as f64;
        let predicted = intercept + slope * future_x;

        let residuals: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, value)| value - (intercept + slope * i as f64))
            .collect();
        let rse = stats::sample_stdev(&residuals);
        let interval = INTERVAL_Z * rse * (1.0 + 0.02 * days_ahead as f64);

        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        let ss_tot: f64 = values.iter().map(|v| (v - y_mean).powi(2)).sum();
        let r_squared = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else {
            0.0
        };

        let mut confidence = (r_squared * 0.8).clamp(0.4, 0.95);
        confidence -= 0.003 * days_ahead as f64;
        confidence = confidence.max(0.3);

        MethodForecast {
            predicted,
            lower: (predicted - interval).max(0.0),
            upper: predicted + interval,
            confidence,
        }
    }

    /// 指数加重平均予測
    ///
    /// 直近の値ほど重く評価するEMAを予測値とし、区間はEMA周りの
    /// 分散から1日あたり1.5%拡大する。
    fn weighted_average(&self, values: &[f64], days_ahead: u32) -> MethodForecast {
        let mut ema = values[0];
        for value in &values[1..] {
            ema = EMA_ALPHA * value + (1.0 - EMA_ALPHA) * ema;
        }

        let variance =
            values.iter().map(|v| (v - ema).powi(2)).sum::<f64>() / values.len() as f64;
        let stdev = variance.sqrt();

        let confidence = (0.85 - 0.004 * days_ahead as f64).max(0.5);
        let interval = INTERVAL_Z * stdev * (1.0 + 0.015 * days_ahead as f64);

        MethodForecast {
            predicted: ema,
            lower: (ema - interval).max(0.0),
            upper: ema + interval,
            confidence,
        }
    }

    /// 3手法の信頼度加重アンサンブル
    ///
    /// 各手法を自身の信頼度で重み付けして合成する。アンサンブルの
    /// 信頼度は3手法の平均に0.05を上乗せし、0.95で頭打ちにする。
    fn ensemble(&self, values: &[f64], days_ahead: u32) -> MethodForecast {
        let ma = self.moving_average(values, days_ahead);
        let lr = self.linear_trend(values, days_ahead);
        let wa = self.weighted_average(values, days_ahead);

        let mut total_conf = ma.confidence + lr.confidence + wa.confidence;
        if total_conf == 0.0 {
            total_conf = 1.0;
        }
        let w_ma = ma.confidence / total_conf;
        let w_lr = lr.confidence / total_conf;
        let w_wa = wa.confidence / total_conf;

        let predicted = w_ma * ma.predicted + w_lr * lr.predicted + w_wa * wa.predicted;
        let lower = w_ma * ma.lower + w_lr * lr.lower + w_wa * wa.lower;
        let upper = w_ma * ma.upper + w_lr * lr.upper + w_wa * wa.upper;

        let confidence =
            ((ma.confidence + lr.confidence + wa.confidence) / 3.0 + 0.05).min(0.95);

        MethodForecast {
            predicted,
            lower: lower.max(0.0),
            upper,
            confidence,
        }
    }

    /// 直近7日を検証データとしたバックテスト精度（1 - MAPE）
    ///
    /// 14点未満、または検証値が全て0以下ならNone。
    fn backtest_accuracy(&self, values: &[f64]) -> Option<f64> {
        if values.len() < 2 * BACKTEST_DAYS {
            return None;
        }

        let split = values.len() - BACKTEST_DAYS;
        let mut errors = Vec::with_capacity(BACKTEST_DAYS);
        for (i, actual) in values[split..].iter().enumerate() {
            let mf = self.moving_average(&values[..split + i], 1);
            if *actual > 0.0 {
                errors.push((mf.predicted - actual).abs() / actual);
            }
        }

        if errors.is_empty() {
            return None;
        }

        let mape = stats::mean(&errors);
        Some(stats::round_to((1.0 - mape).max(0.0), 3))
    }
}

impl Default for TrafficForecaster {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

/// ホライズン日数に対応する日次予測点を返す（系列より先はその末尾）
fn horizon_point(daily_forecasts: &[ForecastPoint], horizon: usize) -> ForecastPoint {
    let idx = horizon.min(daily_forecasts.len()) - 1;
    daily_forecasts[idx]
}

/// 予測根拠の説明文を組み立てる
fn build_explanation(
    direction: TrendDirection,
    strength: f64,
    method: ForecastMethod,
    values: &[f64],
) -> String {
    let recent_avg = if values.len() >= 7 {
        stats::mean(&values[values.len() - 7..])
    } else {
        stats::mean(values)
    };
    let overall_avg = stats::mean(values);

    let mut parts: Vec<String> = Vec::new();

    match direction {
        TrendDirection::Increasing => {
            parts.push("The metric shows an increasing trend".to_string());
            if strength > 0.5 {
                parts.push("with strong momentum".to_string());
            }
        }
        TrendDirection::Decreasing => {
            parts.push("The metric shows a decreasing trend".to_string());
            if strength > 0.5 {
                parts.push("that requires attention".to_string());
            }
        }
        TrendDirection::Stable => {
            parts.push("The metric is relatively stable".to_string());
        }
    }

    parts.push(format!("Forecast generated {}", method.description()));

    if overall_avg > 0.0 {
        let recent_vs_overall = (recent_avg - overall_avg) / overall_avg * 100.0;
        if recent_vs_overall.abs() > 10.0 {
            let position = if recent_vs_overall > 0.0 {
                "above"
            } else {
                "below"
            };
            parts.push(format!(
                "Recent average is {:.0}% {} historical average",
                recent_vs_overall.abs(),
                position
            ));
        }
    }

    format!("{}.", parts.join(". "))
}

/// 予測に影響する要因リストを組み立てる
fn identify_factors(values: &[f64], direction: TrendDirection) -> Vec<String> {
    let mut factors = Vec::new();

    if values.len() > 7 {
        let stdev = stats::sample_stdev(values);
        let mean = stats::mean(values);
        let cv = if mean > 0.0 { stdev / mean } else { 0.0 };
        if cv > 0.3 {
            factors.push("High volatility may reduce forecast accuracy".to_string());
        }
    }

    match direction {
        TrendDirection::Decreasing => {
            factors.push("Current downward trend factored into projection".to_string());
        }
        TrendDirection::Increasing => {
            factors.push("Current upward trend factored into projection".to_string());
        }
        TrendDirection::Stable => {}
    }

    factors.push("Forecast based on recent historical patterns".to_string());
    factors.push("External factors (algorithm updates, competition) not modeled".to_string());
    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{MetricPoint, MetricType};
    use chrono::NaiveDate;

    fn series_of(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricPoint::new(start + Duration::days(i as i64), *v))
            .collect();
        TimeSeries {
            site_id: "https://example.com".to_string(),
            metric: MetricType::OrganicTraffic,
            dimension: None,
            points,
        }
    }

    #[test]
    fn test_insufficient_data_returns_none() {
        let forecaster = TrafficForecaster::default();
        let series = series_of(&[100.0; 10]);
        assert!(forecaster.forecast(&series, &[30, 60, 90]).is_none());
    }

    #[test]
    fn test_flat_series_forecast() {
        let forecaster = TrafficForecaster::default();
        let series = series_of(&[1000.0; 30]);

        let forecast = forecaster.forecast(&series, &[30, 60, 90]).unwrap();
        assert_eq!(forecast.method, ForecastMethod::Ensemble);
        assert_eq!(forecast.daily_forecasts.len(), 90);
        assert_eq!(forecast.trend_direction, TrendDirection::Stable);

        // 全手法が定数系列を正確に再現する
        let first = &forecast.daily_forecasts[0];
        assert_eq!(first.predicted_value, 1000.0);
        assert_eq!(first.lower_bound, 1000.0);
        assert_eq!(first.upper_bound, 1000.0);

        // バックテストも誤差ゼロ
        assert_eq!(forecast.model_accuracy, Some(1.0));

        assert_eq!(
            forecast.explanation,
            "The metric is relatively stable. Forecast generated using an ensemble of statistical methods."
        );
    }

    #[test]
    fn test_horizon_points_match_daily_series() {
        let forecaster = TrafficForecaster::default();
        let values: Vec<f64> = (0..30).map(|i| 500.0 + i as f64).collect();
        let series = series_of(&values);

        let forecast = forecaster.forecast(&series, &[30, 60, 90]).unwrap();
        assert_eq!(forecast.forecast_30d, forecast.daily_forecasts[29]);
        assert_eq!(forecast.forecast_60d, forecast.daily_forecasts[59]);
        assert_eq!(forecast.forecast_90d, forecast.daily_forecasts[89]);
    }

    #[test]
    fn test_short_horizon_falls_back_to_last_point() {
        let forecaster = TrafficForecaster::default();
        let series = series_of(&[800.0; 20]);

        let forecast = forecaster.forecast(&series, &[7]).unwrap();
        assert_eq!(forecast.daily_forecasts.len(), 7);
        // 30/60/90日地点は系列末尾で代用される
        assert_eq!(forecast.forecast_30d, forecast.daily_forecasts[6]);
        assert_eq!(forecast.forecast_90d, forecast.daily_forecasts[6]);
    }

    #[test]
    fn test_moving_average_confidence_decays() {
        let config = ForecastConfig {
            use_ensemble: false,
            ..ForecastConfig::default()
        };
        let forecaster = TrafficForecaster::new(config);
        let series = series_of(&[1000.0; 30]);

        let forecast = forecaster.forecast(&series, &[30, 60, 90]).unwrap();
        assert_eq!(forecast.method, ForecastMethod::MovingAverage);

        let daily = &forecast.daily_forecasts;
        assert!(daily[6].confidence >= daily[29].confidence);
        assert!(daily[29].confidence >= daily[89].confidence);
        // 減衰は0.5で下げ止まる
        assert_eq!(daily[89].confidence, 0.5);
    }

    #[test]
    fn test_bounds_always_ordered() {
        let forecaster = TrafficForecaster::default();
        // 急減する線形系列では線形回帰の予測が負に突き抜ける
        let values: Vec<f64> = (0..14).map(|i| 1400.0 - 100.0 * i as f64).collect();
        let series = series_of(&values);

        let forecast = forecaster.forecast(&series, &[30, 60, 90]).unwrap();
        for point in &forecast.daily_forecasts {
            assert!(point.lower_bound >= 0.0);
            assert!(point.lower_bound <= point.predicted_value);
            assert!(point.predicted_value <= point.upper_bound);
        }
        assert_eq!(forecast.trend_direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_decreasing_trend_explanation_and_factors() {
        let forecaster = TrafficForecaster::default();
        let values: Vec<f64> = (0..28).map(|i| 2000.0 - 50.0 * i as f64).collect();
        let series = series_of(&values);

        let forecast = forecaster.forecast(&series, &[30]).unwrap();
        assert_eq!(forecast.trend_direction, TrendDirection::Decreasing);
        assert!(forecast.explanation.contains("decreasing trend"));
        assert!(forecast
            .factors
            .contains(&"Current downward trend factored into projection".to_string()));
        assert!(forecast
            .factors
            .contains(&"External factors (algorithm updates, competition) not modeled".to_string()));
    }

    #[test]
    fn test_strong_momentum_wording() {
        let forecaster = TrafficForecaster::default();
        // 後半平均が前半の2倍を超え、強度が0.5を上回る
        let mut values = vec![500.0; 14];
        values.extend(vec![1500.0; 14]);
        let series = series_of(&values);

        let forecast = forecaster.forecast(&series, &[30]).unwrap();
        assert_eq!(forecast.trend_direction, TrendDirection::Increasing);
        assert!(forecast.trend_strength > 0.5);
        assert!(forecast
            .explanation
            .starts_with("The metric shows an increasing trend. with strong momentum"));
    }

    #[test]
    fn test_high_volatility_factor() {
        let forecaster = TrafficForecaster::default();
        // 変動係数が0.3を超える荒い系列
        let values: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 100.0 } else { 900.0 })
            .collect();
        let series = series_of(&values);

        let forecast = forecaster.forecast(&series, &[30]).unwrap();
        assert!(forecast
            .factors
            .contains(&"High volatility may reduce forecast accuracy".to_string()));
    }

    #[test]
    fn test_backtest_accuracy_reasonable_for_stable_series() {
        let forecaster = TrafficForecaster::default();
        let values: Vec<f64> = (0..30).map(|i| 1000.0 + (i % 3) as f64 * 5.0).collect();
        let series = series_of(&values);

        let forecast = forecaster.forecast(&series, &[30]).unwrap();
        let accuracy = forecast.model_accuracy.unwrap();
        assert!(accuracy > 0.9);
        assert!(accuracy <= 1.0);
    }
}
