//! OpenAI-compatible HTTP provider (`/embeddings` + `/chat/completions`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{Completion, CompletionRequest, ModelProvider};
use crate::config::ProviderConfig;

pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    embed_model: String,
    embed_timeout: Duration,
    completion_timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            anyhow::bail!("provider API key is empty (set KEEL_PROVIDER_API_KEY)");
        }
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            embed_model: config.embed_model.clone(),
            embed_timeout: Duration::from_secs(config.embed_timeout_secs),
            completion_timeout: Duration::from_secs(config.completion_timeout_secs),
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embed_model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.endpoint))
            .bearer_auth(&self.api_key)
            .timeout(self.embed_timeout)
            .json(&request)
            .send()
            .await
            .context("embedding request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("embedding API error {status}: {body}"));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("failed to decode embedding response")?;
        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedding response contained no vectors"))?;

        debug!(dims = first.embedding.len(), "embedded query text");
        Ok(first.embedding)
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion> {
        let body = ChatRequest {
            model: request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: request.user_message,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .timeout(self.completion_timeout)
            .json(&body)
            .send()
            .await
            .context("completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("completion API error {status}: {body}"));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to decode completion response")?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("completion response contained no choices"))?;

        // Fall back to a rough estimate if the provider omits usage.
        let tokens_used = parsed
            .usage
            .map(|u| u.total_tokens)
            .unwrap_or_else(|| (choice.message.content.len() / 4) as u32);

        Ok(Completion {
            text: choice.message.content,
            tokens_used,
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn test_config(endpoint: String) -> ProviderConfig {
        ProviderConfig {
            kind: "openai".into(),
            endpoint,
            api_key: "test-key".into(),
            embed_model: "text-embedding-3-small".into(),
            embed_timeout_secs: 5,
            completion_timeout_secs: 5,
        }
    }

    #[test]
    fn empty_api_key_rejected() {
        let mut config = test_config("http://localhost".into());
        config.api_key = String::new();
        assert!(OpenAiProvider::new(&config).is_err());
    }

    #[tokio::test]
    async fn embed_parses_vector() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#)
            .create_async()
            .await;

        let provider = OpenAiProvider::new(&test_config(server.url())).unwrap();
        let vector = provider.embed("hello").await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn embed_surfaces_api_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let provider = OpenAiProvider::new(&test_config(server.url())).unwrap();
        let err = provider.embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn complete_returns_text_and_usage() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [{"message": {"role": "assistant", "content": "Hi there"}}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
                }"#,
            )
            .create_async()
            .await;

        let provider = OpenAiProvider::new(&test_config(server.url())).unwrap();
        let completion = provider
            .complete(CompletionRequest {
                model: "gpt-4o-mini",
                system_prompt: "You are helpful.",
                user_message: "hello",
                temperature: 0.7,
                max_tokens: 256,
            })
            .await
            .unwrap();

        assert_eq!(completion.text, "Hi there");
        assert_eq!(completion.tokens_used, 15);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_estimates_usage_when_missing() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices": [{"message": {"role": "assistant", "content": "0123456789abcdef"}}]}"#,
            )
            .create_async()
            .await;

        let provider = OpenAiProvider::new(&test_config(server.url())).unwrap();
        let completion = provider
            .complete(CompletionRequest {
                model: "gpt-4o-mini",
                system_prompt: "sys",
                user_message: "msg",
                temperature: 0.0,
                max_tokens: 16,
            })
            .await
            .unwrap();

        assert_eq!(completion.tokens_used, 4); // 16 chars / 4
    }
}
