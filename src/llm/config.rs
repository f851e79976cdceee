//! LLM統合の設定

use crate::llm::error::{LlmError, LlmResult};
use crate::llm::retry::RetryPolicy;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// LLMプロバイダー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// 決定的なモックプロバイダー（テスト・オフライン用）
    Mock,
    /// OpenAI (GPT-4oなど)
    OpenAI,
}

/// LLM設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// プロバイダー
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,
    /// APIキー（セキュア）
    #[serde(skip_serializing, default)]
    pub api_key: Option<SecretString>,
    /// デフォルトモデル
    #[serde(default = "default_model")]
    pub default_model: String,
    /// リクエストタイムアウト（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// リトライポリシー
    #[serde(default)]
    pub retry: RetryPolicy,
    /// デフォルト温度
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    /// デフォルト最大トークン数
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: usize,
}

fn default_provider() -> LlmProvider {
    LlmProvider::Mock
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> usize {
    1024
}

impl LlmConfig {
    /// モック設定を作成
    pub fn mock() -> Self {
        Self::default()
    }

    /// OpenAI設定を作成
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: Some(SecretString::new(api_key.into().into_boxed_str())),
            default_model: model.into(),
            timeout_secs: default_timeout(),
            retry: RetryPolicy::default(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
        }
    }

    /// 環境変数からOpenAI設定を読み込み
    pub fn openai_from_env() -> LlmResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::ConfigError("OPENAI_API_KEY not set".to_string()))?;

        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| default_model());

        Ok(Self::openai(api_key, model))
    }

    /// タイムアウトを取得
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// APIキーを取得（露出）
    pub fn get_api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }

    /// 設定を検証
    pub fn validate(&self) -> LlmResult<()> {
        // プロバイダー固有の検証
        match self.provider {
            LlmProvider::OpenAI => {
                if self.api_key.is_none() {
                    return Err(LlmError::ConfigError(
                        "API key is required for the OpenAI provider".to_string(),
                    ));
                }
            }
            LlmProvider::Mock => {}
        }

        // 温度の範囲チェック
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(LlmError::ConfigError(
                "Temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        // max_tokensの妥当性チェック
        if self.default_max_tokens == 0 || self.default_max_tokens > 100_000 {
            return Err(LlmError::ConfigError(
                "max_tokens must be between 1 and 100000".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(LlmError::ConfigError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            default_model: default_model(),
            timeout_secs: default_timeout(),
            retry: RetryPolicy::default(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
        }
    }
}
