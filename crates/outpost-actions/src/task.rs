//! Task registry for asynchronous action invocations.
//!
//! A task is created `Running`, its invocation is spawned on its own worker,
//! and the worker records the outcome exactly once, flipping the task to
//! `Done` or `Failed`. Terminal tasks never change again. Pollers only ever
//! see snapshots.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::ActionResult;
use crate::error::ActionError;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Running,
    Done,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Running)
    }
}

/// Cancellation hook supplied by the task's action.
pub type CancelFn = Arc<dyn Fn(&Task) -> Result<(), ActionError> + Send + Sync>;

/// Snapshot of one task.
#[derive(Clone)]
pub struct Task {
    pub id: String,
    /// Method of the action this task runs.
    pub method: String,
    pub state: TaskState,
    /// Result, populated when the task is `Done`.
    pub value: Option<Value>,
    /// Error, populated when the task is `Failed`.
    pub error: Option<ActionError>,
    /// Unix ms when the task was created.
    pub started_at: u64,
    /// Unix ms when the state last changed.
    pub updated_at: u64,
    cancel: Option<CancelFn>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("state", &self.state)
            .field("value", &self.value)
            .field("error", &self.error)
            .field("cancelable", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task with id {0} already exists")]
    Duplicate(String),
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Owns every task of this agent process.
///
/// Cloning is cheap and shares the same map. Different tasks live in
/// different map shards and don't contend with each other.
#[derive(Clone, Default)]
pub struct TaskService {
    /// task id → Task
    tasks: Arc<DashMap<String, Task>>,
    ids: Arc<AtomicU64>,
}

impl TaskService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh, process-unique task id (32 hex chars).
    pub fn next_id(&self) -> String {
        let seq = self.ids.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut h = blake3::Hasher::new();
        h.update(&nanos.to_le_bytes());
        h.update(&seq.to_le_bytes());
        h.update(&std::process::id().to_le_bytes());
        hex::encode(&h.finalize().as_bytes()[..16])
    }

    /// Register a `Running` task and start `run` on its own worker.
    ///
    /// Returns immediately with the initial snapshot. Must be called from
    /// within a Tokio runtime.
    pub fn create_task(
        &self,
        id: String,
        method: impl Into<String>,
        run: BoxFuture<'static, ActionResult>,
        cancel: Option<CancelFn>,
    ) -> Result<Task, TaskError> {
        let now = now_ms();
        let task = Task {
            id: id.clone(),
            method: method.into(),
            state: TaskState::Running,
            value: None,
            error: None,
            started_at: now,
            updated_at: now,
            cancel,
        };

        match self.tasks.entry(id.clone()) {
            Entry::Occupied(_) => return Err(TaskError::Duplicate(id)),
            Entry::Vacant(slot) => {
                slot.insert(task.clone());
            }
        }

        let service = self.clone();
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(ActionError::msg("task panicked")),
            };
            service.complete(&id, result);
        });

        tracing::debug!(task_id = %task.id, method = %task.method, "task started");
        Ok(task)
    }

    /// Record the outcome of a running task. No-op on terminal tasks.
    fn complete(&self, id: &str, result: ActionResult) {
        let Some(mut task) = self.tasks.get_mut(id) else {
            tracing::warn!(task_id = id, "completed task is no longer tracked");
            return;
        };
        if task.state.is_terminal() {
            tracing::warn!(task_id = id, state = ?task.state, "ignoring second completion");
            return;
        }

        task.updated_at = now_ms();
        match result {
            Ok(value) => {
                task.state = TaskState::Done;
                task.value = Some(value);
            }
            Err(err) => {
                task.state = TaskState::Failed;
                task.error = Some(err);
            }
        }
        tracing::info!(task_id = id, method = %task.method, state = ?task.state, "task finished");
    }

    /// Look up a task. `None` is an ordinary outcome for unknown or stale ids.
    pub fn find_task_with_id(&self, id: &str) -> Option<Task> {
        self.tasks.get(id).map(|t| t.clone())
    }

    /// Forward a cancellation request to the task's hook.
    pub fn cancel_task(&self, id: &str) -> Result<(), ActionError> {
        // Clone the snapshot out so the hook runs without holding the shard.
        let task = self
            .find_task_with_id(id)
            .ok_or_else(|| ActionError::TaskNotFound(id.to_string()))?;
        match &task.cancel {
            Some(cancel) => cancel(&task),
            None => Err(ActionError::NotSupported),
        }
    }

    /// Snapshot of every task, oldest first.
    pub fn tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.iter().map(|t| t.value().clone()).collect();
        tasks.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
