//! Memory agent.
//!
//! Stores personal details per user and retrieves the ones relevant to a
//! query. Everything lives in process memory; persistence across restarts is
//! out of scope. Requests arrive as a tagged JSON payload; anything that is
//! not one is treated as a retrieval over the raw text.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Result;
use crate::protocol::{Artifact, Task};
use crate::server::{AgentExecutor, EventSink, RequestContext};

/// Artifact name the memory agent attaches its result under.
pub const MEMORY_ARTIFACT: &str = "memory_result";

/// Reply when retrieval finds nothing.
pub const NO_MEMORY_FOUND: &str = "No memory found.";

/// A request to the memory agent, discriminated by its `action` field.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum MemoryRequest {
    /// Look up stored details relevant to a query.
    Retrieve { user_id: String, query: String },
    /// Remember a new detail.
    Store { user_id: String, data: String },
}

impl MemoryRequest {
    /// Decode a payload, falling back to a retrieval over the raw text when
    /// it is not a recognized request object.
    pub fn decode(raw: &str, default_user_id: &str) -> Self {
        match serde_json::from_str::<MemoryRequest>(raw) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "payload is not a memory request object, retrieving raw text");
                MemoryRequest::Retrieve {
                    user_id: default_user_id.to_string(),
                    query: raw.to_string(),
                }
            }
        }
    }
}

/// In-memory store of remembered details, keyed by user.
pub struct MemoryBank {
    entries: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Append one detail to a user's memories.
    pub async fn store(&self, user_id: &str, data: impl Into<String>) {
        let mut entries = self.entries.write().await;
        entries.entry(user_id.to_string()).or_default().push(data.into());
    }

    /// Details sharing at least one word with the query, best matches first.
    ///
    /// Scoring is a naive count of shared lowercase words; ties keep
    /// insertion order.
    pub async fn retrieve(&self, user_id: &str, query: &str) -> Vec<String> {
        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let entries = self.entries.read().await;
        let Some(memories) = entries.get(user_id) else {
            return Vec::new();
        };

        let mut scored: Vec<(usize, &String)> = memories
            .iter()
            .filter_map(|memory| {
                let lower = memory.to_lowercase();
                let score = query_words
                    .iter()
                    .filter(|word| lower.contains(word.as_str()))
                    .count();
                (score > 0).then_some((score, memory))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, memory)| memory.clone()).collect()
    }

    pub async fn len(&self, user_id: &str) -> usize {
        self.entries
            .read()
            .await
            .get(user_id)
            .map_or(0, Vec::len)
    }
}

impl Default for MemoryBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Serves retrieve and store requests against a [`MemoryBank`].
pub struct MemoryExecutor {
    bank: Arc<MemoryBank>,
    default_user_id: String,
}

impl MemoryExecutor {
    pub fn new(bank: Arc<MemoryBank>, default_user_id: impl Into<String>) -> Self {
        Self {
            bank,
            default_user_id: default_user_id.into(),
        }
    }

    async fn handle(&self, request: MemoryRequest) -> String {
        match request {
            MemoryRequest::Retrieve { user_id, query } => {
                let found = self.bank.retrieve(&user_id, &query).await;
                info!(%user_id, hits = found.len(), "memory retrieval");
                if found.is_empty() {
                    NO_MEMORY_FOUND.to_string()
                } else {
                    found.join("\n")
                }
            }
            MemoryRequest::Store { user_id, data } => {
                self.bank.store(&user_id, data).await;
                info!(%user_id, "memory stored");
                "Memory saved.".to_string()
            }
        }
    }
}

#[async_trait]
impl AgentExecutor for MemoryExecutor {
    async fn execute(&self, ctx: RequestContext, sink: EventSink) -> Result<()> {
        let task = match ctx.current_task() {
            Some(task) => task.clone(),
            None => {
                let task = ctx.new_task();
                sink.task(task.clone());
                task
            }
        };
        sink.working(&task);

        let request = MemoryRequest::decode(&ctx.user_input(), &self.default_user_id);
        let result = self.handle(request).await;

        sink.task(Task::completed(
            &task.id,
            &task.context_id,
            vec![Artifact::text(MEMORY_ARTIFACT, result)],
            vec![ctx.message().clone()],
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::protocol::{Message, TaskEvent, TaskState};

    #[test]
    fn decode_discriminates_on_action_field() {
        let request = MemoryRequest::decode(
            r#"{"action": "retrieve", "user_id": "joe", "query": "grandson"}"#,
            "default_user",
        );
        assert_eq!(
            request,
            MemoryRequest::Retrieve {
                user_id: "joe".to_string(),
                query: "grandson".to_string(),
            }
        );

        let request = MemoryRequest::decode(
            r#"{"action": "store", "user_id": "joe", "data": "Tommy plays chess"}"#,
            "default_user",
        );
        assert!(matches!(request, MemoryRequest::Store { .. }));
    }

    #[test]
    fn decode_falls_back_to_retrieval_over_raw_text() {
        let request = MemoryRequest::decode("tell me about Tommy", "default_user");
        assert_eq!(
            request,
            MemoryRequest::Retrieve {
                user_id: "default_user".to_string(),
                query: "tell me about Tommy".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn retrieve_ranks_by_shared_words() {
        let bank = MemoryBank::new();
        bank.store("joe", "Tommy visits on Sundays").await;
        bank.store("joe", "Tommy plays chess with Joe every evening").await;
        bank.store("joe", "The garden needs watering").await;

        let found = bank.retrieve("joe", "does tommy play chess").await;
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], "Tommy plays chess with Joe every evening");
    }

    #[tokio::test]
    async fn retrieve_is_scoped_per_user() {
        let bank = MemoryBank::new();
        bank.store("joe", "Tommy visits on Sundays").await;

        assert!(bank.retrieve("ann", "Tommy").await.is_empty());
        assert_eq!(bank.retrieve("joe", "Tommy").await.len(), 1);
    }

    async fn run(executor: &MemoryExecutor, payload: &str) -> Task {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let message = Message::user_text(payload, Some("ctx-mem".to_string()));
        executor
            .execute(RequestContext::new(message, None), EventSink::new(tx))
            .await
            .unwrap();
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if let TaskEvent::Task(task) = event {
                last = Some(task);
            }
        }
        last.expect("no task snapshot emitted")
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trip() {
        let bank = Arc::new(MemoryBank::new());
        let executor = MemoryExecutor::new(Arc::clone(&bank), "default_user");

        let stored = run(
            &executor,
            r#"{"action": "store", "user_id": "joe", "data": "Tommy plays chess"}"#,
        )
        .await;
        assert_eq!(stored.status.state, TaskState::Completed);
        assert_eq!(stored.artifact_text(), "Memory saved.");
        assert_eq!(bank.len("joe").await, 1);

        let retrieved = run(
            &executor,
            r#"{"action": "retrieve", "user_id": "joe", "query": "chess"}"#,
        )
        .await;
        assert_eq!(retrieved.artifact_text(), "Tommy plays chess");
    }

    #[tokio::test]
    async fn empty_retrieval_reports_no_memory() {
        let executor = MemoryExecutor::new(Arc::new(MemoryBank::new()), "default_user");
        let task = run(&executor, "anything at all").await;
        assert_eq!(task.artifact_text(), NO_MEMORY_FOUND);
    }
}
