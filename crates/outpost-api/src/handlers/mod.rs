//! HTTP API handlers.

mod agent;
mod tasks;

pub use agent::handle_agent;
pub use tasks::{handle_tasks, TaskInfo};

use outpost_actions::Dispatcher;

#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Dispatcher,
}
