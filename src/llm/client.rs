//! LLMクライアント
//!
//! プロバイダーへの補完呼び出しをリトライポリシー付きで仲介する。

use crate::llm::{
    config::LlmConfig,
    error::LlmResult,
    providers::{create_provider, CompletionProvider},
    types::{CompletionRequest, CompletionResponse},
};

/// LLMクライアント
pub struct LlmClient {
    provider: Box<dyn CompletionProvider>,
    config: LlmConfig,
}

impl LlmClient {
    /// 設定からクライアントを作成
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        config.validate()?;
        let provider = create_provider(&config)?;

        Ok(Self { provider, config })
    }

    /// プロバイダーを直接注入してクライアントを作成
    pub fn with_provider(provider: Box<dyn CompletionProvider>, config: LlmConfig) -> Self {
        Self { provider, config }
    }

    /// 設定を取得
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// 補完リクエストを送信（接続系エラーはリトライ）
    pub async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        self.config
            .retry
            .run("completion request", || self.provider.complete(&request))
            .await
    }

    /// システムプロンプト付きの補完
    pub async fn complete_with_system(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> LlmResult<String> {
        let request = CompletionRequest::with_system(system_prompt, user_prompt)
            .with_temperature(self.config.default_temperature)
            .with_max_tokens(self.config.default_max_tokens);
        let response = self.complete(request).await?;
        Ok(response.content)
    }

    /// プロバイダー名を取得
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::mock::MockProvider;
    use crate::llm::retry::RetryPolicy;

    #[test]
    fn test_client_creation_with_mock() {
        let client = LlmClient::new(LlmConfig::mock());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().provider_name(), "mock");
    }

    #[test]
    fn test_client_creation_invalid_config() {
        let mut config = LlmConfig::mock();
        config.default_temperature = 5.0;
        assert!(LlmClient::new(config).is_err());
    }

    #[tokio::test]
    async fn test_complete_retries_through_transient_failures() {
        let mut config = LlmConfig::mock();
        config.retry = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            multiplier: 2.0,
            max_delay_ms: 5,
        };
        let client = LlmClient::with_provider(Box::new(MockProvider::failing(2)), config);

        let result = client
            .complete_with_system("Classify keywords.", r#"["buy cheap laptop"]"#)
            .await;

        assert!(result.is_ok());
        assert!(result.unwrap().contains("transactional"));
    }

    #[tokio::test]
    async fn test_complete_gives_up_after_max_attempts() {
        let mut config = LlmConfig::mock();
        config.retry = RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1,
            multiplier: 2.0,
            max_delay_ms: 5,
        };
        let client = LlmClient::with_provider(Box::new(MockProvider::failing(5)), config);

        let result = client.complete_with_system("Classify.", r#"["x"]"#).await;
        assert!(result.is_err());
    }
}
