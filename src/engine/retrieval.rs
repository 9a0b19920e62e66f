//! Retrieval engine: embed the query, run a namespace-scoped top-K search,
//! and shape the matches into context fragments.

use tracing::debug;

use crate::engine::types::RetrievedFragment;
use crate::error::{CoreError, Result};
use crate::index::cache::SharedClients;

pub const DEFAULT_TOP_K: usize = 8;

/// Retrieve the `top_k` most relevant fragments for `query` under the
/// agent's namespace.
///
/// An empty vec means "no relevant documents"; infrastructure failure
/// (embedding or index query) is [`CoreError::RetrievalUnavailable`] so
/// callers can tell the two apart. Scores are the index's own; fragments
/// keep its descending-score order.
pub async fn retrieve(
    clients: &SharedClients,
    agent_id: &str,
    query: &str,
    top_k: usize,
) -> Result<Vec<RetrievedFragment>> {
    let index = clients
        .index_handle()
        .await
        .map_err(|e| CoreError::RetrievalUnavailable(format!("index unavailable: {e}")))?;

    let vector = clients
        .provider()
        .embed(query)
        .await
        .map_err(|e| CoreError::RetrievalUnavailable(format!("embedding failed: {e}")))?;

    let matches = index
        .query(agent_id, &vector, top_k)
        .await
        .map_err(|e| CoreError::RetrievalUnavailable(format!("vector query failed: {e}")))?;

    let fragments: Vec<RetrievedFragment> = matches
        .into_iter()
        .filter_map(|m| {
            let text = m.metadata.get("text")?.as_str()?.to_string();
            let document_id = m
                .metadata
                .get("document_id")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            Some(RetrievedFragment {
                text,
                score: m.score,
                document_id,
            })
        })
        .collect();

    debug!(agent_id, count = fragments.len(), "retrieved fragments");
    Ok(fragments)
}

/// Concatenate fragment texts in descending-score order into a single
/// context block for prompt assembly.
pub fn context_block(fragments: &[RetrievedFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
