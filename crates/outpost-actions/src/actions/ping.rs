use serde_json::json;

use outpost_core::ProtocolVersion;

use crate::action::{Action, ActionResult};

/// Liveness check.
pub struct PingAction;

impl Action for PingAction {
    type Params = ();

    async fn run(&self, _params: ()) -> ActionResult {
        Ok(json!("pong"))
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
