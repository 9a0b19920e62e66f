//! Document ingestion pipeline — validate, upload to the chunking service,
//! then catalog.
//!
//! [`ingest`] is the single entry point. Validation happens before any
//! network call; the upload is the hard step (its failure fails the whole
//! operation); the catalog write is recoverable — the document is already
//! searchable by then, so a failed write downgrades to a success with a
//! warning rather than an error.

use tracing::{info, warn};

use crate::chunker::ChunkServiceClient;
use crate::engine::types::{DocumentRecord, IngestReport};
use crate::error::{CoreError, Result};
use crate::store::conversations::ConversationStore;

/// Document types the chunking service understands.
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "html", "htm", "csv", "json"];

/// Full ingestion path: validate → chunk/index upload → catalog write.
pub async fn ingest(
    chunker: &ChunkServiceClient,
    store: &dyn ConversationStore,
    agent_id: &str,
    file_bytes: Vec<u8>,
    file_name: &str,
    metadata: Option<serde_json::Value>,
) -> Result<IngestReport> {
    validate_upload(&file_bytes, file_name)?;
    let metadata_json = validate_metadata(metadata.as_ref())?;

    let chunks = chunker
        .upload(agent_id, file_bytes, file_name, metadata_json)
        .await?;
    info!(agent_id, file_name, chunks, "document chunked and indexed");

    let record = DocumentRecord {
        agent_id: agent_id.to_string(),
        file_name: file_name.to_string(),
        metadata,
        ingested_at: chrono::Utc::now().to_rfc3339(),
        catalogued: true,
    };

    match store.upsert_document_record(&record).await {
        Ok(()) => Ok(IngestReport::Success { chunks }),
        Err(e) => {
            // The document is already searchable; only its catalog entry is
            // missing. Report success with a warning, never a failure.
            warn!(agent_id, file_name, error = %e, "catalog write failed after successful ingestion");
            Ok(IngestReport::SuccessWithWarning {
                chunks,
                reason: format!("catalog write failed: {e}"),
            })
        }
    }
}

fn validate_upload(file_bytes: &[u8], file_name: &str) -> Result<()> {
    if file_bytes.is_empty() {
        return Err(CoreError::InvalidMetadata("uploaded file is empty".into()));
    }
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(CoreError::InvalidMetadata(format!(
            "unsupported document type: {file_name} (supported: {})",
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }
    Ok(())
}

/// Metadata must be a flat key/value object: string keys, scalar values.
/// Returns the serialized form for the multipart field.
fn validate_metadata(metadata: Option<&serde_json::Value>) -> Result<Option<String>> {
    let Some(value) = metadata else {
        return Ok(None);
    };
    let Some(object) = value.as_object() else {
        return Err(CoreError::InvalidMetadata(
            "metadata must be a JSON object".into(),
        ));
    };
    for (key, entry) in object {
        if entry.is_object() || entry.is_array() {
            return Err(CoreError::InvalidMetadata(format!(
                "metadata must be flat; key '{key}' holds a nested value"
            )));
        }
    }
    Ok(Some(value.to_string()))
}
