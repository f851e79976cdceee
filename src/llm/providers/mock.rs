//! モックプロバイダー
//!
//! 外部依存なしで動く決定的なプロバイダー。意図分類プロンプトの
//! JSON配列からキーワードを取り出し、部分文字列シグナルで
//! 分類結果を組み立てて返す。テストでは失敗回数を注入して
//! リトライ経路も再現できる。

use crate::llm::{
    error::{LlmError, LlmResult},
    providers::CompletionProvider,
    types::{CompletionRequest, CompletionResponse, TokenUsage},
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

const MOCK_SIGNALS: &[(&str, &[&str])] = &[
    (
        "informational",
        &[
            "how to", "what is", "why", "guide", "tutorial", "learn", "tips", "ideas", "examples",
            "definition", "meaning", "explained",
        ],
    ),
    (
        "commercial",
        &[
            "best",
            "top",
            "review",
            "comparison",
            "vs",
            "versus",
            "alternative",
            "compare",
            "which",
            "difference between",
            "rated",
        ],
    ),
    (
        "transactional",
        &[
            "buy",
            "price",
            "cheap",
            "discount",
            "deal",
            "order",
            "purchase",
            "shop",
            "coupon",
            "sale",
            "free shipping",
            "cost",
        ],
    ),
];

/// 決定的なモック補完プロバイダー
pub struct MockProvider {
    /// 成功するまでに返す失敗回数（テスト用）
    failures_remaining: AtomicU32,
}

impl MockProvider {
    /// 新しいモックプロバイダーを作成
    pub fn new() -> Self {
        Self {
            failures_remaining: AtomicU32::new(0),
        }
    }

    /// 最初のn回の呼び出しを接続エラーで失敗させる
    pub fn failing(times: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(times),
        }
    }

    fn classify_keyword(keyword: &str) -> (&'static str, f64) {
        let lower = keyword.to_lowercase();
        for (intent, signals) in MOCK_SIGNALS {
            if signals.iter().any(|s| lower.contains(s)) {
                return (intent, 0.85);
            }
        }
        ("informational", 0.7)
    }

    fn extract_keywords(prompt: &str) -> Vec<String> {
        let start = match prompt.find('[') {
            Some(i) => i,
            None => return vec!["test keyword".to_string()],
        };
        let end = match prompt[start..].find(']') {
            Some(i) => start + i + 1,
            None => return vec!["test keyword".to_string()],
        };

        serde_json::from_str::<Vec<String>>(&prompt[start..end])
            .unwrap_or_else(|_| vec!["test keyword".to_string()])
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(LlmError::NetworkError(
                "mock connection failure".to_string(),
            ));
        }

        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        debug!("Mock completion, prompt length {}", prompt.len());

        let keywords = Self::extract_keywords(&prompt);
        let results: Vec<serde_json::Value> = keywords
            .iter()
            .map(|kw| {
                let (intent, confidence) = Self::classify_keyword(kw);
                json!({
                    "keyword": kw,
                    "intent": intent,
                    "confidence": confidence,
                })
            })
            .collect();

        let content = serde_json::to_string(&results)?;
        Ok(CompletionResponse {
            content,
            model: "mock".to_string(),
            usage: TokenUsage::new(prompt.len() / 4, keywords.len() * 16),
            id: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Message;

    #[tokio::test]
    async fn test_mock_classifies_from_prompt_array() {
        let provider = MockProvider::new();
        let request = CompletionRequest::new(vec![Message::user(
            r#"Classify these keywords: ["buy shoes online", "how to tie shoes"]"#,
        )]);

        let response = provider.complete(&request).await.unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&response.content).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["intent"], "transactional");
        assert_eq!(parsed[1]["intent"], "informational");
    }

    #[tokio::test]
    async fn test_mock_defaults_to_informational() {
        let provider = MockProvider::new();
        let request =
            CompletionRequest::new(vec![Message::user(r#"Classify: ["zyxwv qwerty"]"#)]);

        let response = provider.complete(&request).await.unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&response.content).unwrap();

        assert_eq!(parsed[0]["intent"], "informational");
        assert_eq!(parsed[0]["confidence"], 0.7);
    }

    #[tokio::test]
    async fn test_failing_provider_recovers() {
        let provider = MockProvider::failing(2);
        let request = CompletionRequest::new(vec![Message::user(r#"["test"]"#)]);

        assert!(provider.complete(&request).await.is_err());
        assert!(provider.complete(&request).await.is_err());
        assert!(provider.complete(&request).await.is_ok());
    }
}
