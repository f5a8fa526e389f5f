//! Dispatcher: turns a decoded request into a response.
//!
//! Synchronous actions run inline. Asynchronous ones are bound up front, then
//! handed to the task service; the caller gets the task id back immediately
//! and polls with `get_task`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};

use outpost_core::{AgentRequest, AgentResponse, ProtocolVersion};

use crate::action::{ActionResult, DynAction};
use crate::error::ActionError;
use crate::ledger::{LedgerEntry, TaskLedger};
use crate::registry::ActionRegistry;
use crate::runner;
use crate::task::{CancelFn, Task, TaskService};

/// Audit log target for loggable actions.
pub const AUDIT_TARGET: &str = "outpost::audit";

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
    tasks: TaskService,
    ledger: TaskLedger,
    default_protocol: ProtocolVersion,
}

impl Dispatcher {
    pub fn new(
        registry: ActionRegistry,
        tasks: TaskService,
        ledger: TaskLedger,
        default_protocol: ProtocolVersion,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            tasks,
            ledger,
            default_protocol,
        }
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    /// Handle one request. Never fails: every error becomes an exception response.
    pub async fn dispatch(&self, request: AgentRequest) -> AgentResponse {
        let AgentRequest {
            method,
            arguments,
            protocol,
        } = request;
        let protocol = protocol.unwrap_or(self.default_protocol);

        let Some(action) = self.registry.create(&method) else {
            tracing::warn!(method = %method, "unknown message");
            return AgentResponse::exception(format!("unknown message {method}"));
        };

        match self.invoke(&method, action, protocol, arguments).await {
            Ok(value) => AgentResponse::value(value),
            Err(err) => {
                tracing::debug!(method = %method, error = %err, "action failed");
                AgentResponse::exception(err.to_string())
            }
        }
    }

    async fn invoke(
        &self,
        method: &str,
        action: Arc<dyn DynAction>,
        protocol: ProtocolVersion,
        arguments: Vec<Value>,
    ) -> ActionResult {
        let asynchronous = action.is_asynchronous(protocol);
        if action.is_loggable() {
            tracing::info!(
                target: AUDIT_TARGET,
                method,
                protocol = protocol.get(),
                arguments = arguments.len(),
                asynchronous,
                "action requested"
            );
        } else {
            tracing::debug!(method, protocol = protocol.get(), "action requested");
        }

        if !asynchronous {
            return AssertUnwindSafe(runner::run(action, protocol, arguments))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(method, "action panicked");
                    Err(ActionError::msg("action panicked"))
                });
        }

        // Bind before creating the task so bad arguments fail the request itself.
        let run = action
            .clone()
            .prepare(protocol, arguments)
            .map_err(ActionError::msg)?;
        let task = self
            .start_task(self.tasks.next_id(), method, action, run)
            .await?;
        Ok(json!({ "agent_task_id": task.id, "state": "running" }))
    }

    async fn start_task(
        &self,
        id: String,
        method: &str,
        action: Arc<dyn DynAction>,
        run: BoxFuture<'static, ActionResult>,
    ) -> Result<Task, ActionError> {
        let persistent = action.is_persistent();
        if persistent {
            self.ledger
                .record(LedgerEntry {
                    id: id.clone(),
                    method: method.to_string(),
                })
                .await
                .map_err(|e| ActionError::msg(format!("Recording task {id}: {e}")))?;
        }

        let run: BoxFuture<'static, ActionResult> = if persistent {
            let ledger = self.ledger.clone();
            let id = id.clone();
            Box::pin(async move {
                let result = run.await;
                if let Err(e) = ledger.remove(&id).await {
                    tracing::warn!(task_id = %id, error = %e, "failed to clear finished task from ledger");
                }
                result
            })
        } else {
            run
        };

        let cancel: CancelFn = Arc::new(move |task: &Task| {
            tracing::info!(target: AUDIT_TARGET, task_id = %task.id, method = %task.method, "cancel requested");
            action.cancel()
        });

        self.tasks
            .create_task(id, method, run, Some(cancel))
            .map_err(ActionError::msg)
    }

    /// Restart every task the previous agent process left unfinished.
    ///
    /// Each entry gets a fresh action whose `resume` runs under the old id.
    /// Must be called from within a Tokio runtime.
    pub async fn resume_persisted(&self) -> usize {
        let mut resumed = 0;
        for entry in self.ledger.entries().await {
            let Some(action) = self.registry.create(&entry.method) else {
                tracing::warn!(task_id = %entry.id, method = %entry.method, "dropping persisted task of unknown method");
                if let Err(e) = self.ledger.remove(&entry.id).await {
                    tracing::warn!(task_id = %entry.id, error = %e, "failed to clear ledger entry");
                }
                continue;
            };

            let run = action.clone().resume();
            match self
                .start_task(entry.id.clone(), &entry.method, action, run)
                .await
            {
                Ok(_) => {
                    tracing::info!(task_id = %entry.id, method = %entry.method, "resumed persisted task");
                    resumed += 1;
                }
                Err(e) => {
                    tracing::warn!(task_id = %entry.id, error = %e, "could not resume persisted task");
                }
            }
        }
        resumed
    }
}
