//! Runner: binds a request against an action and invokes it in place.

use std::sync::Arc;

use serde_json::Value;

use outpost_core::ProtocolVersion;

use crate::action::{ActionResult, DynAction};
use crate::error::ActionError;

/// Bind and run to completion. Bind failures surface as [`ActionError::Failed`]
/// carrying the bind message; the action is never invoked in that case.
pub async fn run(
    action: Arc<dyn DynAction>,
    protocol: ProtocolVersion,
    arguments: Vec<Value>,
) -> ActionResult {
    let invocation = action
        .prepare(protocol, arguments)
        .map_err(ActionError::msg)?;
    invocation.await
}

/// Resume takes no arguments and does no binding.
pub async fn resume(action: Arc<dyn DynAction>) -> ActionResult {
    action.resume().await
}
