use serde_json::json;

use outpost_core::ProtocolVersion;

use crate::action::{Action, ActionResult};
use crate::binder::Arg;
use crate::task::TaskService;

/// Forwards a cancellation request to a running task.
pub struct CancelTaskAction {
    tasks: TaskService,
}

impl CancelTaskAction {
    pub fn new(tasks: TaskService) -> Self {
        Self { tasks }
    }
}

impl Action for CancelTaskAction {
    type Params = (Arg<String>,);

    async fn run(&self, (Arg(id),): Self::Params) -> ActionResult {
        self.tasks.cancel_task(&id)?;
        Ok(json!("canceled"))
    }

    fn is_asynchronous(&self, _protocol: ProtocolVersion) -> bool {
        false
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn is_loggable(&self) -> bool {
        true
    }
}
