//! LLMプロバイダー実装

pub mod mock;
#[cfg(feature = "llm-integration")]
pub mod openai;

use crate::llm::{
    config::LlmConfig,
    error::LlmResult,
    types::{CompletionRequest, CompletionResponse},
};
use async_trait::async_trait;

/// 補完プロバイダートレイト
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// 補完リクエストを実行
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse>;

    /// プロバイダー名を取得
    fn name(&self) -> &str;
}

/// プロバイダーファクトリー
pub fn create_provider(config: &LlmConfig) -> LlmResult<Box<dyn CompletionProvider>> {
    use crate::llm::config::LlmProvider as ProviderType;

    match config.provider {
        ProviderType::Mock => Ok(Box::new(mock::MockProvider::new())),
        #[cfg(feature = "llm-integration")]
        ProviderType::OpenAI => Ok(Box::new(openai::OpenAIProvider::new(config.clone())?)),
        #[cfg(not(feature = "llm-integration"))]
        ProviderType::OpenAI => Err(crate::llm::error::LlmError::UnsupportedProvider(
            "OpenAI provider requires the llm-integration feature".to_string(),
        )),
    }
}
