//! OpenAIプロバイダー実装

use crate::llm::{
    config::LlmConfig,
    error::{LlmError, LlmResult},
    providers::CompletionProvider,
    types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage},
};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;

/// OpenAIプロバイダー
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl OpenAIProvider {
    /// 新しいOpenAIプロバイダーを作成
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        config.validate()?;

        let api_key = config
            .get_api_key()
            .ok_or_else(|| LlmError::ConfigError("API key is required".to_string()))?;

        let openai_config = OpenAIConfig::new().with_api_key(api_key);
        let client = Client::with_config(openai_config);

        Ok(Self { client, config })
    }

    /// メッセージを変換
    fn convert_messages(&self, messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .filter_map(|msg| match msg.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .ok()
                    .map(Into::into),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .ok()
                    .map(Into::into),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .ok()
                    .map(Into::into),
            })
            .collect()
    }

    /// APIエラーをLlmErrorへ変換
    fn map_error(&self, err: OpenAIError) -> LlmError {
        match err {
            OpenAIError::Reqwest(e) => {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout_secs)
                } else {
                    LlmError::NetworkError(e.to_string())
                }
            }
            OpenAIError::ApiError(e) => {
                let message = e.message.clone();
                match e.code.as_deref() {
                    Some("invalid_api_key") => LlmError::AuthError(message),
                    Some("rate_limit_exceeded") => LlmError::RateLimitError(message),
                    _ => LlmError::ApiError(message),
                }
            }
            OpenAIError::JSONDeserialize(e) => LlmError::MalformedResponse(e.to_string()),
            other => LlmError::ApiError(other.to_string()),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse> {
        let messages = self.convert_messages(&request.messages);

        let model = request
            .model
            .as_ref()
            .unwrap_or(&self.config.default_model)
            .clone();

        let mut req_builder = CreateChatCompletionRequestArgs::default();
        req_builder.model(&model).messages(messages);

        if let Some(temp) = request.temperature {
            req_builder.temperature(temp);
        } else {
            req_builder.temperature(self.config.default_temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            req_builder.max_tokens(max_tokens as u32);
        } else {
            req_builder.max_tokens(self.config.default_max_tokens as u32);
        }

        let chat_request = req_builder
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| self.map_error(e))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::MalformedResponse("No choices in response".to_string()))?;

        let content = choice.message.content.clone().unwrap_or_default();

        let usage = if let Some(u) = response.usage {
            TokenUsage::new(u.prompt_tokens as usize, u.completion_tokens as usize)
        } else {
            TokenUsage::default()
        };

        Ok(CompletionResponse {
            content,
            model: response.model,
            usage,
            id: Some(response.id),
            finish_reason: choice.finish_reason.as_ref().map(|r| format!("{:?}", r)),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}
