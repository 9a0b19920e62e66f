//! Document/conversation store.
//!
//! Holds document catalog entries and the append-only per-session message
//! sequences. Accessed through the [`ConversationStore`] trait so the
//! orchestrator and tests can run against either the REST back-end or the
//! in-memory one.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::ConversationsConfig;
use crate::engine::types::{ConversationTurn, DocumentRecord};

/// Trait for the document-oriented conversation store.
///
/// `append_messages` creates the session implicitly if it does not exist.
/// Turn sequences are append-only; the core never reorders or deduplicates.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Write a document catalog entry.
    async fn upsert_document_record(&self, record: &DocumentRecord) -> Result<()>;

    /// Cheap existence probe: does any catalog entry exist for this agent?
    async fn find_any_document(&self, agent_id: &str) -> Result<bool>;

    /// Append turns to a session's message sequence, creating the session
    /// with initial metadata if absent.
    async fn append_messages(&self, session_id: &str, turns: &[ConversationTurn]) -> Result<()>;
}

// ── REST back-end ─────────────────────────────────────────────────────────────

pub struct RestConversationStore {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl RestConversationStore {
    pub fn new(config: &ConversationsConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.request_timeout_ms),
        })
    }
}

#[async_trait]
impl ConversationStore for RestConversationStore {
    async fn upsert_document_record(&self, record: &DocumentRecord) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/documents", self.endpoint))
            .timeout(self.timeout)
            .json(record)
            .send()
            .await
            .context("document record write failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "document record write failed ({})",
                response.status()
            ));
        }
        Ok(())
    }

    async fn find_any_document(&self, agent_id: &str) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/documents/{agent_id}/exists", self.endpoint))
            .timeout(self.timeout)
            .send()
            .await
            .context("document existence probe failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "document existence probe failed ({})",
                response.status()
            ));
        }

        let parsed: ExistsResponse = response
            .json()
            .await
            .context("failed to decode existence response")?;
        Ok(parsed.exists)
    }

    async fn append_messages(&self, session_id: &str, turns: &[ConversationTurn]) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/sessions/{session_id}/messages", self.endpoint))
            .timeout(self.timeout)
            .json(turns)
            .send()
            .await
            .context("message append failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("message append failed ({})", response.status()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    exists: bool,
}

// ── In-memory back-end ────────────────────────────────────────────────────────

/// In-memory store used by tests and local development.
#[derive(Default)]
pub struct MemoryConversationStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    documents: Vec<DocumentRecord>,
    sessions: HashMap<String, Vec<ConversationTurn>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one session's turns, in append order.
    pub fn session_turns(&self, session_id: &str) -> Vec<ConversationTurn> {
        let state = self.state.lock().expect("store mutex poisoned");
        state.sessions.get(session_id).cloned().unwrap_or_default()
    }

    pub fn document_count(&self, agent_id: &str) -> usize {
        let state = self.state.lock().expect("store mutex poisoned");
        state
            .documents
            .iter()
            .filter(|d| d.agent_id == agent_id)
            .count()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn upsert_document_record(&self, record: &DocumentRecord) -> Result<()> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.documents.push(record.clone());
        Ok(())
    }

    async fn find_any_document(&self, agent_id: &str) -> Result<bool> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.documents.iter().any(|d| d.agent_id == agent_id))
    }

    async fn append_messages(&self, session_id: &str, turns: &[ConversationTurn]) -> Result<()> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state
            .sessions
            .entry(session_id.to_string())
            .or_default()
            .extend(turns.iter().cloned());
        Ok(())
    }
}
