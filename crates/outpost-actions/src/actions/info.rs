use serde_json::json;

use outpost_core::ProtocolVersion;

use crate::action::{Action, ActionResult};

/// Version of the action set this agent implements.
pub const API_VERSION: u32 = 1;

/// Reports the agent API version and the protocol version the request
/// was served under.
pub struct InfoAction;

impl Action for InfoAction {
    type Params = (ProtocolVersion,);

    async fn run(&self, (protocol,): Self::Params) -> ActionResult {
        Ok(json!({ "api_version": API_VERSION, "protocol": protocol }))
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
