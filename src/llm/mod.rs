//! LLM統合システム
//!
//! このモジュールは、意図分類のフォールバックに使う補完プロバイダー
//! （モック、OpenAI）との統合機能を提供します。

pub mod client;
pub mod config;
pub mod error;
pub mod providers;
pub mod retry;
pub mod types;

pub use client::LlmClient;
pub use config::{LlmConfig, LlmProvider};
pub use error::{LlmError, LlmResult};
pub use providers::{create_provider, CompletionProvider};
pub use retry::RetryPolicy;
pub use types::{CompletionRequest, CompletionResponse, Message, Role};
