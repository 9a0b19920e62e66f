//! CLI commands: `ask`, `ingest`, and `doctor`.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use keel::chunker::ChunkServiceClient;
use keel::config::KeelConfig;
use keel::engine::types::AgentConfig;
use keel::engine::execute::Executor;
use keel::engine::persist::PersistenceHandle;
use keel::index::cache::SharedClients;
use keel::index::rest::RestVectorIndex;
use keel::provider::create_provider;
use keel::store::conversations::{ConversationStore, RestConversationStore};
use keel::store::counters::CounterStore;

/// Wire up the shared clients and stores from config.
fn build_clients(config: &KeelConfig) -> Result<(Arc<SharedClients>, Arc<dyn ConversationStore>)> {
    let index = Arc::new(RestVectorIndex::new(&config.index)?);
    let provider = create_provider(&config.provider)?;
    let clients = Arc::new(SharedClients::new(index, provider, config.index.dimension));
    let conversations: Arc<dyn ConversationStore> =
        Arc::new(RestConversationStore::new(&config.conversations)?);
    Ok((clients, conversations))
}

/// Run one execution and print the result as JSON.
pub async fn ask(
    config: &KeelConfig,
    agent: &AgentConfig,
    session: Option<String>,
    message: &str,
) -> Result<()> {
    let (clients, conversations) = build_clients(config)?;
    clients
        .initialize()
        .await
        .context("vector index initialization failed")?;

    let counters = Arc::new(CounterStore::open(config.resolved_counters_path())?);
    let persistence = PersistenceHandle::spawn(
        conversations.clone(),
        config.persistence.workers,
        config.persistence.queue_capacity,
    );

    let executor = Executor::new(
        clients,
        conversations,
        counters,
        persistence,
        config.counter_write_budget(),
        config.availability_budget(),
        config.retrieval.top_k,
    );

    let output = executor.execute(agent, session, message).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Ingest a document from disk for an agent.
pub async fn ingest(
    config: &KeelConfig,
    agent_id: &str,
    file: &Path,
    metadata: Option<&str>,
) -> Result<()> {
    let bytes = std::fs::read(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("file has no usable name")?;
    let metadata = metadata
        .map(serde_json::from_str)
        .transpose()
        .context("metadata is not valid JSON")?;

    let chunker = ChunkServiceClient::new(&config.ingestion)?;
    let (_, conversations) = build_clients(config)?;

    let report = keel::engine::ingest::ingest(
        &chunker,
        conversations.as_ref(),
        agent_id,
        bytes,
        file_name,
        metadata,
    )
    .await?;

    if let Some(warning) = report.warning() {
        eprintln!("warning: {warning}");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Config sanity and connectivity probes.
pub async fn doctor(config: &KeelConfig) -> Result<()> {
    println!("keel doctor");
    println!("  index endpoint:         {}", config.index.endpoint);
    println!("  provider endpoint:      {}", config.provider.endpoint);
    println!("  ingestion endpoint:     {}", config.ingestion.endpoint);
    println!("  conversations endpoint: {}", config.conversations.endpoint);
    println!(
        "  counters db:            {}",
        config.resolved_counters_path().display()
    );

    match CounterStore::open(config.resolved_counters_path()) {
        Ok(_) => println!("  counters open:          ok"),
        Err(e) => println!("  counters open:          FAILED ({e})"),
    }

    let (clients, conversations) = build_clients(config)?;
    match clients.initialize().await {
        Ok(()) => println!("  vector index:           ok"),
        Err(e) => println!("  vector index:           FAILED ({e})"),
    }
    match conversations.find_any_document("__doctor__").await {
        Ok(_) => println!("  conversation store:     ok"),
        Err(e) => println!("  conversation store:     FAILED ({e})"),
    }

    Ok(())
}
