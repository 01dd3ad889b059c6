//! In-memory task store.

use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ServerError;
use crate::protocol::{Task, TaskEvent, TaskStatus};

const DEFAULT_CAPACITY: usize = 256;

/// Holds the tasks an agent has received, for the lifetime of the process.
///
/// Terminal snapshots are immutable: any event that would modify a task in a
/// terminal state is rejected. The store is capacity-capped; when full, the
/// oldest task is evicted to make room.
pub struct TaskStore {
    tasks: RwLock<HashMap<String, Task>>,
    /// Insertion order, oldest first, for eviction.
    order: RwLock<VecDeque<String>>,
    capacity: usize,
}

impl TaskStore {
    /// Store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Store holding at most `capacity` tasks.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            order: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// Fetch a task snapshot by id.
    pub async fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Number of tasks currently held.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Fold a protocol event into the store.
    ///
    /// Task snapshots insert or replace the stored task; status updates
    /// advance the lifecycle through the transition table; artifact updates
    /// append to the task's artifacts. All three respect terminal
    /// immutability.
    pub async fn apply(&self, event: &TaskEvent) -> Result<(), ServerError> {
        match event {
            TaskEvent::Task(task) => self.save(task.clone()).await,
            TaskEvent::StatusUpdate(update) => {
                self.update_status(&update.task_id, update.status.clone())
                    .await
            }
            TaskEvent::ArtifactUpdate(update) => {
                let mut tasks = self.tasks.write().await;
                let task = tasks
                    .get_mut(&update.task_id)
                    .ok_or_else(|| ServerError::TaskNotFound {
                        id: update.task_id.clone(),
                    })?;
                if task.is_terminal() {
                    return Err(ServerError::TerminalTaskImmutable {
                        id: task.id.clone(),
                    });
                }
                task.artifacts.push(update.artifact.clone());
                Ok(())
            }
        }
    }

    /// Insert a new task or replace an existing non-terminal one.
    pub async fn save(&self, task: Task) -> Result<(), ServerError> {
        let mut tasks = self.tasks.write().await;
        if let Some(existing) = tasks.get(&task.id) {
            if existing.is_terminal() {
                return Err(ServerError::TerminalTaskImmutable {
                    id: task.id.clone(),
                });
            }
            tasks.insert(task.id.clone(), task);
            return Ok(());
        }

        // New entry; evict the oldest if at capacity.
        let mut order = self.order.write().await;
        while tasks.len() >= self.capacity {
            match order.pop_front() {
                Some(oldest) => {
                    debug!(task_id = %oldest, "evicting oldest task");
                    tasks.remove(&oldest);
                }
                None => break,
            }
        }
        order.push_back(task.id.clone());
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Advance a stored task's lifecycle state.
    pub async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<(), ServerError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| ServerError::TaskNotFound {
                id: task_id.to_string(),
            })?;
        if task.is_terminal() {
            return Err(ServerError::TerminalTaskImmutable {
                id: task.id.clone(),
            });
        }
        if !task.status.state.can_transition_to(status.state) {
            return Err(ServerError::InvalidTransition {
                id: task.id.clone(),
                from: task.status.state.to_string(),
                to: status.state.to_string(),
            });
        }
        task.status = status;
        Ok(())
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
