//! /tasks: read-only task listing for operators.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use outpost_actions::{Task, TaskState};

use super::ApiState;

#[derive(Serialize)]
pub struct TaskInfo {
    pub id: String,
    pub method: String,
    pub state: TaskState,
    pub started_at: u64,
    pub updated_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Task> for TaskInfo {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            method: task.method,
            state: task.state,
            started_at: task.started_at,
            updated_at: task.updated_at,
            error: task.error.map(|e| e.to_string()),
        }
    }
}

pub async fn handle_tasks(State(state): State<ApiState>) -> Json<Vec<TaskInfo>> {
    let tasks = state
        .dispatcher
        .tasks()
        .tasks()
        .into_iter()
        .map(TaskInfo::from)
        .collect();
    Json(tasks)
}
