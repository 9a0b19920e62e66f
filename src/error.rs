//! Error taxonomy for the execution core.
//!
//! Only two failure modes ever reach the caller of an execution:
//! [`CoreError::GenerationFailed`] and [`CoreError::IngestionUpstreamFailed`]
//! (plus pre-flight input validation). Everything else is degraded locally —
//! retrieval failures fall back to non-grounded generation, persistence
//! failures are logged and swallowed.

use thiserror::Error;

/// Why the chunking microservice call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// The service rejected the document (unsupported or corrupt content).
    MalformedInput,
    /// The service could not be reached or timed out.
    Unavailable,
}

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedInput => f.write_str("malformed input"),
            Self::Unavailable => f.write_str("upstream unavailable"),
        }
    }
}

/// Errors surfaced by the execution core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Ingestion input rejected before any network call: empty file,
    /// unsupported document type, or metadata that is not a flat
    /// key/value object.
    #[error("invalid ingestion input: {0}")]
    InvalidMetadata(String),

    /// Embedding or vector-index query failed. Callers must treat this as
    /// "retrieval infrastructure down", distinct from an empty match list.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// The model provider failed (rate limit, timeout, bad credentials).
    /// Fatal for the execution; no local retry.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// The chunking microservice call failed. No catalog entry is written.
    #[error("ingestion upstream failed ({kind}): {message}")]
    IngestionUpstreamFailed {
        kind: UpstreamFailure,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
