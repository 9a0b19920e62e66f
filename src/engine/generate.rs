//! Generation engine — prompt assembly and the model call.
//!
//! Builds a grounded prompt when a context block is supplied, a plain
//! fallback prompt otherwise. Wall-clock time and token usage are always
//! measured. No retry here: retry policy, if any, belongs to the
//! orchestrator.

use std::time::Instant;
use tracing::debug;

use crate::engine::types::{AgentConfig, GenerationResult};
use crate::error::{CoreError, Result};
use crate::provider::{CompletionRequest, ModelProvider};

pub async fn generate(
    provider: &dyn ModelProvider,
    agent: &AgentConfig,
    user_message: &str,
    context: Option<&str>,
) -> Result<GenerationResult> {
    let system_prompt = match context {
        Some(block) => grounded_system_prompt(&agent.system_prompt, block),
        None => agent.system_prompt.clone(),
    };

    let started = Instant::now();
    let completion = provider
        .complete(CompletionRequest {
            model: &agent.model,
            system_prompt: &system_prompt,
            user_message,
            temperature: agent.temperature,
            max_tokens: agent.max_tokens,
        })
        .await
        .map_err(|e| CoreError::GenerationFailed(e.to_string()))?;
    let execution_time = started.elapsed();

    debug!(
        agent_id = %agent.id,
        grounded = context.is_some(),
        tokens = completion.tokens_used,
        elapsed_ms = execution_time.as_millis() as u64,
        "generation complete"
    );

    Ok(GenerationResult {
        text: completion.text,
        tokens_used: completion.tokens_used,
        execution_time,
    })
}

/// System prompt for grounded generation: the agent's own prompt followed by
/// the retrieved fragments and an instruction to answer from them.
fn grounded_system_prompt(system_prompt: &str, context: &str) -> String {
    format!(
        "{system_prompt}\n\n\
         Use the following context to answer the user's question. \
         If the context does not contain the answer, say so.\n\n\
         Context:\n{context}"
    )
}
