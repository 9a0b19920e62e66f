//! Retrieval-augmented execution core for conversational agents.
//!
//! keel sits between a CRUD/API layer and a set of independent external
//! services — a vector index, an embedding/LLM provider, a document-chunking
//! microservice, a relational counters store, and a document-oriented
//! conversation store — and keeps response latency bounded regardless of the
//! health of the secondary stores.
//!
//! One execution runs: availability check → (conditional) namespace-scoped
//! retrieval → grounded or fallback generation → synchronous budget-bounded
//! counter write → fire-and-forget conversation append.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`error`] — The error taxonomy separating fatal failures from local degradations
//! - [`provider`] — Embedding/completion provider trait and OpenAI-compatible client
//! - [`index`] — Vector index trait, REST client, and the process-wide client cache
//! - [`chunker`] — Client for the external chunking/embedding microservice
//! - [`store`] — Usage counters (SQLite) and the conversation/document store
//! - [`engine`] — Retrieval, availability, ingestion, generation, orchestration, persistence

pub mod chunker;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod provider;
pub mod store;
