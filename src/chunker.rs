//! Client for the external chunking/embedding microservice.
//!
//! The service accepts a multipart upload, splits the document, computes
//! embeddings, and writes the vectors into the index under the agent's
//! namespace. Vector insertion never happens locally.

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::IngestionConfig;
use crate::error::{CoreError, UpstreamFailure};

pub struct ChunkServiceClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl ChunkServiceClient {
    pub fn new(config: &IngestionConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Upload a document for chunking and indexing under `namespace`.
    /// Returns the number of chunks the service upserted into the index.
    ///
    /// 4xx responses map to [`UpstreamFailure::MalformedInput`], everything
    /// else (5xx, transport errors, timeout) to
    /// [`UpstreamFailure::Unavailable`].
    pub async fn upload(
        &self,
        namespace: &str,
        file_bytes: Vec<u8>,
        file_name: &str,
        metadata_json: Option<String>,
    ) -> std::result::Result<usize, CoreError> {
        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(file_bytes).file_name(file_name.to_string()),
            )
            .text("namespace", namespace.to_string());
        if let Some(metadata) = metadata_json {
            form = form.text("metadata", metadata);
        }

        let response = self
            .client
            .post(format!("{}/ingest", self.endpoint))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoreError::IngestionUpstreamFailed {
                kind: UpstreamFailure::Unavailable,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let kind = if status.is_client_error() {
                UpstreamFailure::MalformedInput
            } else {
                UpstreamFailure::Unavailable
            };
            return Err(CoreError::IngestionUpstreamFailed {
                kind,
                message: format!("{status}: {body}"),
            });
        }

        let parsed: UploadResponse =
            response
                .json()
                .await
                .map_err(|e| CoreError::IngestionUpstreamFailed {
                    kind: UpstreamFailure::Unavailable,
                    message: format!("undecodable response: {e}"),
                })?;

        debug!(namespace, count = parsed.upserted_count, "chunks upserted");
        Ok(parsed.upserted_count)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upserted_count: usize,
}
