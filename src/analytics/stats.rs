//! Statistical Primitives
//!
//! 検知・予測で共用する統計量ヘルパー

/// 算術平均（空なら0.0）
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 標本標準偏差（n-1、2点未満なら0.0）
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// 昇順ソート済みコピーを返す
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut copy = values.to_vec();
    copy.sort_by(f64::total_cmp);
    copy
}

/// 四分位（インデックス法: q1=sorted[n/4], q3=sorted[3n/4]）
pub fn quartiles(sorted_values: &[f64]) -> (f64, f64) {
    let n = sorted_values.len();
    (sorted_values[n / 4], sorted_values[3 * n / 4])
}

/// 分布内の百分位（value未満の割合、%、小数1桁）
pub fn percentile_of(value: f64, values: &[f64]) -> f64 {
    if values.is_empty() {
        return 50.0;
    }
    let below = values.iter().filter(|v| **v < value).count();
    round_to(below as f64 / values.len() as f64 * 100.0, 1)
}

/// 小数digits桁に丸める
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
