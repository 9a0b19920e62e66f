//! Storage back-ends.
//!
//! Two independent stores, each with its own connection handling and no
//! transactions spanning both:
//!
//! - [`counters`] — relational usage counters in SQLite, written
//!   synchronously under a short budget.
//! - [`conversations`] — the document/conversation store, written
//!   asynchronously by the persistence workers.

pub mod conversations;
pub mod counters;
