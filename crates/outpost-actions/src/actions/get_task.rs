use serde_json::json;

use outpost_core::ProtocolVersion;

use crate::action::{Action, ActionResult};
use crate::binder::Arg;
use crate::error::ActionError;
use crate::task::{TaskService, TaskState};

/// Longest underlying error message embedded in a failed task's result.
pub const MAX_EMBEDDED_MESSAGE: usize = 8 * 1024;

/// Reports the state or outcome of an asynchronous task.
pub struct GetTaskAction {
    tasks: TaskService,
}

impl GetTaskAction {
    pub fn new(tasks: TaskService) -> Self {
        Self { tasks }
    }
}

impl Action for GetTaskAction {
    type Params = (Arg<String>,);

    async fn run(&self, (Arg(id),): Self::Params) -> ActionResult {
        let task = self
            .tasks
            .find_task_with_id(&id)
            .ok_or_else(|| ActionError::TaskNotFound(id.clone()))?;

        match task.state {
            TaskState::Running => Ok(json!({ "agent_task_id": task.id, "state": "running" })),
            TaskState::Done => Ok(task.value.unwrap_or_default()),
            TaskState::Failed => {
                let message = task.error.map(|e| e.to_string()).unwrap_or_default();
                Err(ActionError::Failed(format!(
                    "Task {id} result: {}",
                    bounded(&message, MAX_EMBEDDED_MESSAGE)
                )))
            }
        }
    }

    fn is_asynchronous(&self, _protocol: ProtocolVersion) -> bool {
        false
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn is_loggable(&self) -> bool {
        false
    }
}

/// Cut `message` to at most `max` bytes on a char boundary.
fn bounded(message: &str, max: usize) -> std::borrow::Cow<'_, str> {
    if message.len() <= max {
        return message.into();
    }
    let mut end = max;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &message[..end]).into()
}
