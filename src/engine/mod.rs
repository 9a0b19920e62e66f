//! The execution engine: availability check, retrieval, generation,
//! orchestration, and persistence.
//!
//! [`execute::Executor`] is the entry point; the other modules are the
//! stages it drives.

pub mod availability;
pub mod execute;
pub mod generate;
pub mod ingest;
pub mod persist;
pub mod retrieval;
pub mod types;
