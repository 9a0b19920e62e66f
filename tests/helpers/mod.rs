#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keel::engine::execute::Executor;
use keel::engine::persist::PersistenceHandle;
use keel::engine::types::{AgentConfig, ConversationTurn, DocumentRecord};
use keel::index::cache::SharedClients;
use keel::index::{IndexMatch, VectorIndex};
use keel::provider::{Completion, CompletionRequest, ModelProvider};
use keel::store::conversations::{ConversationStore, MemoryConversationStore};
use keel::store::counters::CounterStore;

/// In-memory namespace-partitioned vector index.
#[derive(Default)]
pub struct FakeVectorIndex {
    pub creations: AtomicUsize,
    vectors: Mutex<HashMap<String, Vec<(String, f64, String)>>>,
}

impl FakeVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fragment under a namespace, as the chunking microservice
    /// would after an upload.
    pub fn seed(&self, namespace: &str, text: &str, score: f64, document_id: &str) {
        self.vectors
            .lock()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .push((text.to_string(), score, document_id.to_string()));
    }
}

#[async_trait]
impl VectorIndex for FakeVectorIndex {
    async fn ensure_index(&self, _dimension: usize) -> Result<()> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        _vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexMatch>> {
        let vectors = self.vectors.lock().unwrap();
        let mut hits: Vec<_> = vectors.get(namespace).cloned().unwrap_or_default();
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits
            .into_iter()
            .take(top_k)
            .map(|(text, score, document_id)| IndexMatch {
                score,
                metadata: serde_json::json!({"text": text, "document_id": document_id}),
            })
            .collect())
    }

    async fn namespace_stats(&self, namespace: &str) -> Result<u64> {
        let vectors = self.vectors.lock().unwrap();
        Ok(vectors.get(namespace).map(|v| v.len() as u64).unwrap_or(0))
    }
}

/// Provider whose completion echoes the prompts it was given, so tests can
/// assert what context reached the model. Counts embed calls.
#[derive(Default)]
pub struct EchoProvider {
    pub embed_calls: AtomicUsize,
    pub fail_embed: bool,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_embed() -> Self {
        Self {
            embed_calls: AtomicUsize::new(0),
            fail_embed: true,
        }
    }
}

#[async_trait]
impl ModelProvider for EchoProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embed {
            anyhow::bail!("embedding service down");
        }
        Ok(vec![0.1, 0.2, 0.3, 0.4])
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion> {
        Ok(Completion {
            text: format!("[{}] {}", request.system_prompt, request.user_message),
            tokens_used: 42,
        })
    }
}

/// Conversation store with failure and latency knobs around an in-memory core.
pub struct ShimStore {
    pub inner: MemoryConversationStore,
    pub append_delay: Option<Duration>,
    pub fail_upsert: bool,
    pub fail_find: bool,
    pub find_calls: AtomicUsize,
}

impl ShimStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryConversationStore::new(),
            append_delay: None,
            fail_upsert: false,
            fail_find: false,
            find_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_append_delay(mut self, delay: Duration) -> Self {
        self.append_delay = Some(delay);
        self
    }

    pub fn with_failing_upsert(mut self) -> Self {
        self.fail_upsert = true;
        self
    }

    pub fn with_failing_find(mut self) -> Self {
        self.fail_find = true;
        self
    }
}

#[async_trait]
impl ConversationStore for ShimStore {
    async fn upsert_document_record(&self, record: &DocumentRecord) -> Result<()> {
        if self.fail_upsert {
            anyhow::bail!("document store write failed");
        }
        self.inner.upsert_document_record(record).await
    }

    async fn find_any_document(&self, agent_id: &str) -> Result<bool> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_find {
            anyhow::bail!("document store unreachable");
        }
        self.inner.find_any_document(agent_id).await
    }

    async fn append_messages(&self, session_id: &str, turns: &[ConversationTurn]) -> Result<()> {
        if let Some(delay) = self.append_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.append_messages(session_id, turns).await
    }
}

/// A catalogued document record for seeding stores.
pub fn document_record(agent_id: &str, file_name: &str) -> DocumentRecord {
    DocumentRecord {
        agent_id: agent_id.into(),
        file_name: file_name.into(),
        metadata: None,
        ingested_at: chrono::Utc::now().to_rfc3339(),
        catalogued: true,
    }
}

pub fn agent(id: &str) -> AgentConfig {
    AgentConfig {
        id: id.into(),
        name: id.into(),
        system_prompt: "You are a helpful assistant.".into(),
        model: "gpt-4o-mini".into(),
        temperature: 0.7,
        max_tokens: 512,
        provider: "openai".into(),
        retrieval_enabled: true,
    }
}

pub struct TestRig {
    pub executor: Executor,
    pub index: Arc<FakeVectorIndex>,
    pub provider: Arc<EchoProvider>,
    pub store: Arc<ShimStore>,
    pub counters: Arc<CounterStore>,
}

/// Wire an executor over the given fakes with CI-friendly budgets.
pub fn rig_with(index: FakeVectorIndex, provider: EchoProvider, store: ShimStore) -> TestRig {
    let index = Arc::new(index);
    let provider = Arc::new(provider);
    let store = Arc::new(store);
    let counters = Arc::new(CounterStore::open_in_memory().unwrap());

    let clients = Arc::new(SharedClients::new(index.clone(), provider.clone(), 4));
    let persistence = PersistenceHandle::spawn(store.clone(), 2, 64);
    let executor = Executor::new(
        clients,
        store.clone(),
        counters.clone(),
        persistence,
        Duration::from_millis(500),
        Duration::from_millis(500),
        8,
    );

    TestRig {
        executor,
        index,
        provider,
        store,
        counters,
    }
}

pub fn rig() -> TestRig {
    rig_with(FakeVectorIndex::new(), EchoProvider::new(), ShimStore::new())
}

/// Poll until the session holds `expected` turns or the timeout lapses.
pub async fn wait_for_turns(
    store: &ShimStore,
    session_id: &str,
    expected: usize,
    timeout: Duration,
) -> Vec<ConversationTurn> {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        let turns = store.inner.session_turns(session_id);
        if turns.len() >= expected || std::time::Instant::now() >= deadline {
            return turns;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
