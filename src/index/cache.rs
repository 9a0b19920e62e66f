//! Process-wide client cache.
//!
//! [`SharedClients`] owns exactly one vector index handle and one model
//! provider handle for the lifetime of the process. The index-existence
//! check runs once: concurrent first callers coalesce onto a single
//! upstream creation call, and once it succeeds it is never re-verified on
//! the hot path. The cache is an explicit value passed by reference, not a
//! global.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use super::VectorIndex;
use crate::provider::ModelProvider;

pub struct SharedClients {
    index: Arc<dyn VectorIndex>,
    provider: Arc<dyn ModelProvider>,
    dimension: usize,
    ready: OnceCell<()>,
}

impl SharedClients {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        provider: Arc<dyn ModelProvider>,
        dimension: usize,
    ) -> Self {
        Self {
            index,
            provider,
            dimension,
            ready: OnceCell::new(),
        }
    }

    /// Run the one-time index-existence check. Call at startup so a broken
    /// index configuration fails the process instead of the first request.
    pub async fn initialize(&self) -> Result<()> {
        self.index_handle().await.map(|_| ())
    }

    /// The cached index handle, verified exactly once.
    pub async fn index_handle(&self) -> Result<&Arc<dyn VectorIndex>> {
        self.ready
            .get_or_try_init(|| async {
                debug!(dimension = self.dimension, "verifying vector index");
                self.index.ensure_index(self.dimension).await
            })
            .await?;
        Ok(&self.index)
    }

    /// The cached model provider handle. Pure lookup, no I/O.
    pub fn provider(&self) -> &Arc<dyn ModelProvider> {
        &self.provider
    }
}
