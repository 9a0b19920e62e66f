//! Two-tier availability check: "does this agent have ingested documents?"
//!
//! Tier 1 asks the document store (fast metadata probe, bounded by a short
//! budget). If the store is slow or down, tier 2 asks the vector index for
//! namespace stats — the index is the actual source of truth for
//! retrievability. If both tiers fail the answer is `Unknown` and callers
//! degrade to non-grounded generation rather than blocking.

use std::time::Duration;
use tracing::warn;

use crate::engine::types::Availability;
use crate::index::cache::SharedClients;
use crate::store::conversations::ConversationStore;

pub async fn availability(
    store: &dyn ConversationStore,
    clients: &SharedClients,
    agent_id: &str,
    store_budget: Duration,
) -> Availability {
    match tokio::time::timeout(store_budget, store.find_any_document(agent_id)).await {
        Ok(Ok(true)) => return Availability::Available,
        Ok(Ok(false)) => return Availability::Unavailable,
        Ok(Err(e)) => {
            warn!(agent_id, error = %e, "document store probe failed, trying index stats");
        }
        Err(_) => {
            warn!(agent_id, "document store probe timed out, trying index stats");
        }
    }

    let index = match clients.index_handle().await {
        Ok(index) => index,
        Err(e) => {
            warn!(agent_id, error = %e, "index unavailable during availability check");
            return Availability::Unknown;
        }
    };

    match index.namespace_stats(agent_id).await {
        Ok(count) if count > 0 => Availability::Available,
        Ok(_) => Availability::Unavailable,
        Err(e) => {
            warn!(agent_id, error = %e, "index stats failed, availability unknown");
            Availability::Unknown
        }
    }
}
