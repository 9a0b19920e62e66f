//! Core type definitions for the execution engine.
//!
//! Defines [`AgentConfig`] (read-only input from the surrounding layer),
//! [`DocumentRecord`] (catalog entries), [`RetrievedFragment`] (ephemeral
//! search hits), [`ConversationTurn`] (append-only session messages), and the
//! result types produced by executions and ingestions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Agent configuration consumed from the surrounding CRUD layer.
///
/// The `id` doubles as the vector-index namespace; everything here is
/// read-only for the duration of one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub system_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub provider: String,
    /// `true` when valid vector-provider credentials are configured for this
    /// agent. Grounding additionally requires that documents exist.
    pub retrieval_enabled: bool,
}

/// Catalog entry for an ingested document. Created once per successful
/// upload; never mutated by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub agent_id: String,
    pub file_name: String,
    /// Flat key/value metadata supplied at upload time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// ISO 8601 ingestion timestamp.
    pub ingested_at: String,
    /// `false` when the document is searchable but its catalog write failed.
    pub catalogued: bool,
}

/// One similarity-search hit. Ephemeral — constructed per retrieval call,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedFragment {
    pub text: String,
    /// Opaque similarity score as supplied by the index; used for ordering
    /// only, never thresholded or re-ranked locally.
    pub score: f64,
    pub document_id: String,
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// Per-turn accounting metadata, present on agent turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMeta {
    pub model: String,
    pub execution_ms: u64,
    pub tokens_used: u32,
}

/// One message in a session's append-only sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub session_id: String,
    pub role: Role,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<TurnMeta>,
    /// ISO 8601 timestamp.
    pub created_at: String,
}

/// Per-agent cumulative usage, owned by the relational counters store.
#[derive(Debug, Clone, Serialize)]
pub struct UsageCounters {
    pub agent_id: String,
    pub execution_count: u64,
    /// ISO 8601 timestamp of the most recent execution.
    pub last_used: String,
}

/// Output of one generation call.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    pub tokens_used: u32,
    pub execution_time: Duration,
}

/// Result returned to the surrounding layer for one execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutput {
    pub response_text: String,
    pub execution_ms: u64,
    pub tokens_used: u32,
    pub session_id: String,
    /// Non-fatal degradation notice (e.g. retrieval fell back), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Whether an agent has retrievable documents.
///
/// `Unknown` means neither the document store nor the index stats could
/// answer; callers degrade to non-grounded generation but can log the
/// distinction from a definite `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
    Unknown,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful ingestion. A hard failure is the `Err` side of
/// the surrounding `Result`; this type only distinguishes clean success
/// from success with a degraded catalog write.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestReport {
    /// Document chunked, indexed, and catalogued.
    Success { chunks: usize },
    /// Document chunked and indexed (searchable), but the catalog write
    /// failed. Surfaced as a non-fatal warning.
    SuccessWithWarning { chunks: usize, reason: String },
}

impl IngestReport {
    pub fn chunks(&self) -> usize {
        match self {
            Self::Success { chunks } | Self::SuccessWithWarning { chunks, .. } => *chunks,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::SuccessWithWarning { reason, .. } => Some(reason),
        }
    }
}
