//! Vector index client.
//!
//! Provides the [`VectorIndex`] trait, a REST implementation for
//! Pinecone-style index services, and the process-wide [`cache::SharedClients`]
//! handle that guarantees one-time index initialization.

pub mod cache;
pub mod rest;

use anyhow::Result;
use async_trait::async_trait;

/// One similarity match as returned by the index service.
#[derive(Debug, Clone)]
pub struct IndexMatch {
    /// Opaque similarity score; larger is more similar. The index's native
    /// ordering is preserved downstream.
    pub score: f64,
    /// Stored metadata for the vector, expected to carry at least `text`
    /// and `document_id`.
    pub metadata: serde_json::Value,
}

/// Trait for the external vector index service.
///
/// All vectors and queries are scoped by namespace; a query under one
/// namespace can never see vectors from another.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the target index if it does not exist. Called exactly once per
    /// process by the client cache.
    async fn ensure_index(&self, dimension: usize) -> Result<()>;

    /// Namespace-scoped top-K similarity search.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexMatch>>;

    /// Number of vectors stored under the given namespace.
    async fn namespace_stats(&self, namespace: &str) -> Result<u64>;
}
