//! Execution orchestrator.
//!
//! One [`Executor::execute`] call per user message:
//! availability check → (conditional) retrieval → generation → synchronous
//! counter write → asynchronous turn dispatch → return. The response is
//! never held hostage by secondary stores: retrieval failure degrades to
//! fallback generation, counter writes are budget-bounded and swallowed,
//! and the conversation append is dispatched without being awaited.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::types::{
    AgentConfig, Availability, ConversationTurn, ExecutionOutput, Role, TurnMeta,
};
use crate::engine::{availability, generate, persist, retrieval};
use crate::error::{CoreError, Result};
use crate::index::cache::SharedClients;
use crate::store::conversations::ConversationStore;
use crate::store::counters::CounterStore;

pub struct Executor {
    clients: Arc<SharedClients>,
    conversations: Arc<dyn ConversationStore>,
    counters: Arc<CounterStore>,
    persistence: persist::PersistenceHandle,
    counter_budget: Duration,
    availability_budget: Duration,
    top_k: usize,
}

impl Executor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clients: Arc<SharedClients>,
        conversations: Arc<dyn ConversationStore>,
        counters: Arc<CounterStore>,
        persistence: persist::PersistenceHandle,
        counter_budget: Duration,
        availability_budget: Duration,
        top_k: usize,
    ) -> Self {
        Self {
            clients,
            conversations,
            counters,
            persistence,
            counter_budget,
            availability_budget,
            top_k,
        }
    }

    /// Run one agent invocation. `session_id` is allocated when absent so
    /// the caller can continue the conversation.
    pub async fn execute(
        &self,
        agent: &AgentConfig,
        session_id: Option<String>,
        user_message: &str,
    ) -> Result<ExecutionOutput> {
        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string());

        // Grounding needs both the agent opting in and documents existing.
        let availability = if agent.retrieval_enabled {
            availability::availability(
                self.conversations.as_ref(),
                &self.clients,
                &agent.id,
                self.availability_budget,
            )
            .await
        } else {
            Availability::Unavailable
        };
        debug!(agent_id = %agent.id, %availability, "availability check");

        let mut warning = None;
        let context = if availability == Availability::Available {
            match retrieval::retrieve(&self.clients, &agent.id, user_message, self.top_k).await {
                Ok(fragments) if fragments.is_empty() => None,
                Ok(fragments) => Some(retrieval::context_block(&fragments)),
                Err(e @ CoreError::RetrievalUnavailable(_)) => {
                    warn!(agent_id = %agent.id, error = %e, "retrieval degraded, generating without context");
                    warning = Some("retrieval unavailable, answered without document context".to_string());
                    None
                }
                Err(other) => return Err(other),
            }
        } else {
            None
        };

        let generation = generate::generate(
            self.clients.provider().as_ref(),
            agent,
            user_message,
            context.as_deref(),
        )
        .await?;

        // Synchronous, budget-bounded, loss-tolerant.
        persist::record_usage(self.counters.clone(), &agent.id, self.counter_budget).await;

        // Asynchronous, fire-and-forget.
        let now = chrono::Utc::now().to_rfc3339();
        let execution_ms = generation.execution_time.as_millis() as u64;
        self.persistence.dispatch(
            &session_id,
            vec![
                ConversationTurn {
                    session_id: session_id.clone(),
                    role: Role::User,
                    text: user_message.to_string(),
                    meta: None,
                    created_at: now.clone(),
                },
                ConversationTurn {
                    session_id: session_id.clone(),
                    role: Role::Agent,
                    text: generation.text.clone(),
                    meta: Some(TurnMeta {
                        model: agent.model.clone(),
                        execution_ms,
                        tokens_used: generation.tokens_used,
                    }),
                    created_at: now,
                },
            ],
        );

        info!(
            agent_id = %agent.id,
            session_id = %session_id,
            grounded = context.is_some(),
            tokens = generation.tokens_used,
            execution_ms,
            "execution complete"
        );

        Ok(ExecutionOutput {
            response_text: generation.text,
            execution_ms,
            tokens_used: generation.tokens_used,
            session_id,
            warning,
        })
    }
}
