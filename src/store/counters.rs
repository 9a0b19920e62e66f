//! Relational usage-counters store.
//!
//! A single SQLite table keyed by agent, mutated by one upsert per
//! execution. Counter loss is acceptable (the write runs under a short
//! budget and is abandoned on timeout); response delivery is not.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::engine::types::UsageCounters;

pub struct CounterStore {
    conn: Mutex<Connection>,
}

impl CounterStore {
    /// Open (or create) the counters database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;

        // WAL mode for better concurrent read performance
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(5000))?;

        init_schema(&conn).context("failed to initialize schema")?;

        tracing::info!(path = %path.display(), "counters database initialized");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        init_schema(&conn).context("failed to initialize schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Increment the per-agent execution count and touch its last-used
    /// timestamp. Single-row upsert.
    pub fn record_usage(&self, agent_id: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.conn.lock().expect("counters mutex poisoned");
        conn.execute(
            "INSERT INTO agent_usage (agent_id, execution_count, last_used) \
             VALUES (?1, 1, ?2) \
             ON CONFLICT(agent_id) DO UPDATE SET \
             execution_count = execution_count + 1, last_used = ?2",
            params![agent_id, now],
        )?;
        Ok(())
    }

    /// Read back the counters for one agent, if any executions were recorded.
    pub fn usage(&self, agent_id: &str) -> Result<Option<UsageCounters>> {
        let conn = self.conn.lock().expect("counters mutex poisoned");
        let row = conn
            .query_row(
                "SELECT agent_id, execution_count, last_used FROM agent_usage WHERE agent_id = ?1",
                params![agent_id],
                |row| {
                    Ok(UsageCounters {
                        agent_id: row.get(0)?,
                        execution_count: row.get::<_, i64>(1)? as u64,
                        last_used: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS agent_usage (
            agent_id TEXT PRIMARY KEY,
            execution_count INTEGER NOT NULL DEFAULT 0,
            last_used TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}
