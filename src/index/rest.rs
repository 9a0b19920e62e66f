//! REST client for Pinecone-style vector index services.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

use super::{IndexMatch, VectorIndex};
use crate::config::IndexConfig;

pub struct RestVectorIndex {
    client: Client,
    endpoint: String,
    api_key: String,
    index_name: String,
    query_timeout: Duration,
}

impl RestVectorIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            query_timeout: Duration::from_millis(config.query_timeout_ms),
        })
    }
}

#[async_trait]
impl VectorIndex for RestVectorIndex {
    async fn ensure_index(&self, dimension: usize) -> Result<()> {
        let body = CreateIndexRequest {
            name: &self.index_name,
            dimension,
            metric: "cosine",
        };

        let response = self
            .client
            .post(format!("{}/indexes", self.endpoint))
            .header("Api-Key", &self.api_key)
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .await
            .context("index creation request failed")?;

        match response.status() {
            // 409 means the index already exists, which is the steady state.
            StatusCode::CONFLICT => Ok(()),
            status if status.is_success() => {
                info!(index = %self.index_name, dimension, "created vector index");
                Ok(())
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(anyhow!("index creation failed ({status}): {text}"))
            }
        }
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexMatch>> {
        let body = QueryRequest {
            namespace,
            vector,
            top_k,
            include_metadata: true,
        };

        let response = self
            .client
            .post(format!("{}/query", self.endpoint))
            .header("Api-Key", &self.api_key)
            .timeout(self.query_timeout)
            .json(&body)
            .send()
            .await
            .context("vector query failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("vector query failed ({status}): {text}"));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .context("failed to decode query response")?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| IndexMatch {
                score: m.score,
                metadata: m.metadata.unwrap_or(serde_json::Value::Null),
            })
            .collect())
    }

    async fn namespace_stats(&self, namespace: &str) -> Result<u64> {
        let response = self
            .client
            .post(format!("{}/describe_index_stats", self.endpoint))
            .header("Api-Key", &self.api_key)
            .timeout(self.query_timeout)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("index stats request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!("index stats request failed ({status})"));
        }

        let parsed: StatsResponse = response
            .json()
            .await
            .context("failed to decode stats response")?;

        Ok(parsed
            .namespaces
            .get(namespace)
            .map(|ns| ns.vector_count)
            .unwrap_or(0))
    }
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'static str,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    score: f64,
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Debug, Deserialize)]
struct NamespaceStats {
    #[serde(rename = "vectorCount")]
    vector_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn test_config(endpoint: String) -> IndexConfig {
        IndexConfig {
            endpoint,
            api_key: "test-key".into(),
            index_name: "keel-test".into(),
            dimension: 8,
            query_timeout_ms: 2000,
        }
    }

    #[tokio::test]
    async fn ensure_index_treats_conflict_as_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/indexes")
            .with_status(409)
            .create_async()
            .await;

        let index = RestVectorIndex::new(&test_config(server.url())).unwrap();
        index.ensure_index(8).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ensure_index_surfaces_server_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/indexes")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let index = RestVectorIndex::new(&test_config(server.url())).unwrap();
        assert!(index.ensure_index(8).await.is_err());
    }

    #[tokio::test]
    async fn query_maps_matches_in_order() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/query")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"matches": [
                    {"score": 0.92, "metadata": {"text": "first", "document_id": "d1"}},
                    {"score": 0.71, "metadata": {"text": "second", "document_id": "d2"}}
                ]}"#,
            )
            .create_async()
            .await;

        let index = RestVectorIndex::new(&test_config(server.url())).unwrap();
        let matches = index.query("agent-1", &[0.0; 8], 8).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert!((matches[0].score - 0.92).abs() < 1e-9);
        assert_eq!(matches[0].metadata["text"], "first");
        assert_eq!(matches[1].metadata["document_id"], "d2");
    }

    #[tokio::test]
    async fn namespace_stats_defaults_to_zero_for_absent_namespace() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/describe_index_stats")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"namespaces": {"agent-1": {"vectorCount": 42}}}"#)
            .create_async()
            .await;

        let index = RestVectorIndex::new(&test_config(server.url())).unwrap();
        assert_eq!(index.namespace_stats("agent-1").await.unwrap(), 42);

        assert_eq!(index.namespace_stats("agent-2").await.unwrap(), 0);
    }
}
