//! Trend Classification
//!
//! 時系列の前半・後半比較によるトレンド判定

use crate::analytics::forecast::types::TrendDirection;
use crate::analytics::stats;

/// 方向判定の変化率閾値（±5%）
const DIRECTION_THRESHOLD: f64 = 0.05;

/// トレンド方向と強度（0.0-1.0）を判定する
///
/// 系列を前半と後半に分けて平均を比較する。7点未満、または
/// 前半平均が0の場合は安定扱い。強度は小数3桁に丸める。
pub fn classify_trend(values: &[f64]) -> (TrendDirection, f64) {
    if values.len() < 7 {
        return (TrendDirection::Stable, 0.0);
    }

    let mid = values.len() / 2;
    let first_half = stats::mean(&values[..mid]);
    let second_half = stats::mean(&values[mid..]);

    if first_half == 0.0 {
        return (TrendDirection::Stable, 0.0);
    }

    let change_ratio = (second_half - first_half) / first_half;

    let direction = if change_ratio > DIRECTION_THRESHOLD {
        TrendDirection::Increasing
    } else if change_ratio < -DIRECTION_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    let strength = stats::round_to((change_ratio.abs() * 2.0).min(1.0), 3);
    (direction, strength)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_series_is_stable() {
        let (direction, strength) = classify_trend(&[1.0, 2.0, 3.0]);
        assert_eq!(direction, TrendDirection::Stable);
        assert_eq!(strength, 0.0);
    }

    #[test]
    fn test_increasing_trend() {
        let values: Vec<f64> = (1..=14).map(|i| i as f64 * 100.0).collect();
        let (direction, strength) = classify_trend(&values);
        assert_eq!(direction, TrendDirection::Increasing);
        assert!(strength > 0.5);
    }

    #[test]
    fn test_decreasing_trend() {
        let values: Vec<f64> = (1..=14).rev().map(|i| i as f64 * 100.0).collect();
        let (direction, _) = classify_trend(&values);
        assert_eq!(direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_flat_series_is_stable() {
        let values = vec![500.0; 20];
        let (direction, strength) = classify_trend(&values);
        assert_eq!(direction, TrendDirection::Stable);
        assert_eq!(strength, 0.0);
    }

    #[test]
    fn test_strength_saturates_at_one() {
        // 後半が前半の3倍なら変化率2.0、強度は1.0で飽和
        let mut values = vec![100.0; 7];
        values.extend(vec![300.0; 7]);
        let (direction, strength) = classify_trend(&values);
        assert_eq!(direction, TrendDirection::Increasing);
        assert_eq!(strength, 1.0);
    }
}
