//! Embedding and completion provider abstraction.
//!
//! Provides the [`ModelProvider`] trait and an OpenAI-compatible HTTP
//! implementation. The provider is created via [`create_provider`] from
//! configuration and held for the lifetime of the process by the client
//! cache.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A single completion request. Borrowed fields keep the hot path free of
/// prompt copies.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user_message: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Completion text plus the provider-reported token usage.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

/// Trait for the remote embedding/LLM provider.
///
/// Both calls are network I/O with timeouts configured on the underlying
/// HTTP client.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Run one completion and return text plus token usage.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion>;
}

/// Create a model provider from config.
///
/// Currently only `"openai"` (any OpenAI-compatible endpoint) is supported.
pub fn create_provider(
    config: &crate::config::ProviderConfig,
) -> Result<Arc<dyn ModelProvider>> {
    match config.kind.as_str() {
        "openai" => {
            let provider = openai::OpenAiProvider::new(config)?;
            Ok(Arc::new(provider))
        }
        other => anyhow::bail!("unknown provider kind: {other}. Supported: openai"),
    }
}
