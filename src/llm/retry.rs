//! リトライポリシー
//!
//! 接続系エラーのみを指数バックオフで再試行する。APIエラーや
//! パースエラーは即座に呼び出し元へ返す。

use crate::llm::error::{LlmError, LlmResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 指数バックオフのリトライポリシー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// 最大試行回数（初回を含む）
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 初回待機時間（ミリ秒）
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// 待機時間の倍率
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// 待機時間の上限（ミリ秒）
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// n回目の失敗後の待機時間（0-indexed）
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis((raw as u64).min(self.max_delay_ms))
    }

    /// リトライ対象エラーを再試行しつつ操作を実行
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> LlmResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LlmResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label,
                        attempt + 1,
                        self.max_attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
