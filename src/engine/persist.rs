//! Persistence layer.
//!
//! Two sub-operations with very different contracts:
//!
//! - [`record_usage`] — synchronous counter write, bounded by a short
//!   budget; on timeout or failure the write is abandoned and logged.
//! - [`PersistenceHandle`] — a bounded queue consumed by a small pool of
//!   persistent workers that append conversation turns. Dispatch never
//!   blocks the request path; a full queue sheds the job with a warning.
//!   Workers never feed errors back into request handling.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::types::ConversationTurn;
use crate::store::conversations::ConversationStore;
use crate::store::counters::CounterStore;

/// Update the per-agent usage counters, abandoning the write if it exceeds
/// `budget`. Counter loss is acceptable; added latency is not.
pub async fn record_usage(store: Arc<CounterStore>, agent_id: &str, budget: Duration) {
    let agent = agent_id.to_string();
    let write = tokio::task::spawn_blocking(move || store.record_usage(&agent));

    match tokio::time::timeout(budget, write).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => {
            warn!(agent_id, error = %e, "usage counter write failed, skipping");
        }
        Ok(Err(e)) => {
            warn!(agent_id, error = %e, "usage counter task panicked, skipping");
        }
        Err(_) => {
            warn!(agent_id, budget_ms = budget.as_millis() as u64, "usage counter write over budget, abandoned");
        }
    }
}

struct AppendJob {
    session_id: String,
    turns: Vec<ConversationTurn>,
}

/// Handle to the background conversation-append workers.
///
/// Cheap to clone; dropping all handles closes the queue and lets the
/// workers drain and exit.
#[derive(Clone)]
pub struct PersistenceHandle {
    tx: mpsc::Sender<AppendJob>,
}

impl PersistenceHandle {
    /// Spawn `workers` persistent consumers over a queue of `capacity` jobs.
    pub fn spawn(store: Arc<dyn ConversationStore>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<AppendJob>(capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        for worker_id in 0..workers.max(1) {
            let rx = rx.clone();
            let store = store.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    let Some(job) = job else {
                        debug!(worker_id, "persistence queue closed, worker exiting");
                        break;
                    };
                    if let Err(e) = store.append_messages(&job.session_id, &job.turns).await {
                        warn!(
                            worker_id,
                            session_id = %job.session_id,
                            error = %e,
                            "conversation append failed, turns dropped"
                        );
                    }
                }
            });
        }

        Self { tx }
    }

    /// Enqueue a turn append without waiting for it to complete. If the
    /// queue is full the job is shed and logged — backpressure by dropping
    /// beats unbounded task growth.
    pub fn dispatch(&self, session_id: &str, turns: Vec<ConversationTurn>) {
        let job = AppendJob {
            session_id: session_id.to_string(),
            turns,
        };
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(session_id = %job.session_id, "persistence queue full, turns dropped");
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(session_id = %job.session_id, "persistence workers gone, turns dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{DocumentRecord, Role};
    use crate::store::conversations::MemoryConversationStore;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn turn(session_id: &str, text: &str) -> ConversationTurn {
        ConversationTurn {
            session_id: session_id.into(),
            role: Role::User,
            text: text.into(),
            meta: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn dispatched_turns_are_appended() {
        let store = Arc::new(MemoryConversationStore::new());
        let handle = PersistenceHandle::spawn(store.clone(), 2, 16);

        handle.dispatch("s1", vec![turn("s1", "hi"), turn("s1", "there")]);

        // Workers run detached; poll briefly for the append to land.
        for _ in 0..50 {
            if store.session_turns("s1").len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.session_turns("s1").len(), 2);
    }

    struct SlowStore {
        appended: AtomicUsize,
    }

    #[async_trait]
    impl ConversationStore for SlowStore {
        async fn upsert_document_record(&self, _record: &DocumentRecord) -> AnyResult<()> {
            Ok(())
        }

        async fn find_any_document(&self, _agent_id: &str) -> AnyResult<bool> {
            Ok(false)
        }

        async fn append_messages(
            &self,
            _session_id: &str,
            _turns: &[ConversationTurn],
        ) -> AnyResult<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            self.appended.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn full_queue_sheds_instead_of_blocking() {
        let store = Arc::new(SlowStore {
            appended: AtomicUsize::new(0),
        });
        // One worker stuck on a slow append, capacity 1.
        let handle = PersistenceHandle::spawn(store, 1, 1);

        let started = std::time::Instant::now();
        for i in 0..20 {
            handle.dispatch("s1", vec![turn("s1", &format!("m{i}"))]);
        }
        // try_send never blocks, even with the queue saturated.
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn record_usage_updates_counters() {
        let store = Arc::new(CounterStore::open_in_memory().unwrap());
        record_usage(store.clone(), "a1", Duration::from_millis(500)).await;
        record_usage(store.clone(), "a1", Duration::from_millis(500)).await;

        assert_eq!(store.usage("a1").unwrap().unwrap().execution_count, 2);
    }

    #[tokio::test]
    async fn record_usage_never_panics_on_tiny_budget() {
        let store = Arc::new(CounterStore::open_in_memory().unwrap());
        // A zero budget forces the timeout path; the call must still return.
        record_usage(store, "a1", Duration::from_millis(0)).await;
    }
}
