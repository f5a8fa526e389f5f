//! Action capability contract.
//!
//! Every command the orchestrator can send is an [`Action`]. The engine only
//! ever talks to actions through the object-safe [`DynAction`] view, which
//! binds wire arguments to the action's own `Params` tuple before anything
//! runs.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use outpost_core::ProtocolVersion;

use crate::binder::{self, Params, Signature};
use crate::error::{ActionError, BindError};

pub type ActionResult = Result<Value, ActionError>;

/// A named command with a typed `run`.
pub trait Action: Send + Sync + 'static {
    /// Declared parameters. See [`crate::binder`].
    type Params: Params;

    fn run(&self, params: Self::Params) -> impl Future<Output = ActionResult> + Send;

    /// Whether this action runs as a task. May change across protocol versions.
    fn is_asynchronous(&self, protocol: ProtocolVersion) -> bool;

    /// Whether the task should survive an agent restart.
    fn is_persistent(&self) -> bool;

    /// Whether invocations go to the audit log.
    fn is_loggable(&self) -> bool;

    /// Re-entered after a restart for persistent tasks.
    fn resume(&self) -> impl Future<Output = ActionResult> + Send {
        async { Err(ActionError::NotSupported) }
    }

    /// Request cooperative cancellation. Must not block.
    fn cancel(&self) -> Result<(), ActionError> {
        Err(ActionError::NotSupported)
    }
}

/// Type-erased action as held by the registry and dispatcher.
pub trait DynAction: Send + Sync {
    fn signature(&self) -> Signature;

    fn is_asynchronous(&self, protocol: ProtocolVersion) -> bool;

    fn is_persistent(&self) -> bool;

    fn is_loggable(&self) -> bool;

    /// Bind `arguments` and return the pending invocation.
    ///
    /// Binding happens here, synchronously, so a malformed request is
    /// rejected before any task is created.
    fn prepare(
        self: Arc<Self>,
        protocol: ProtocolVersion,
        arguments: Vec<Value>,
    ) -> Result<BoxFuture<'static, ActionResult>, BindError>;

    fn resume(self: Arc<Self>) -> BoxFuture<'static, ActionResult>;

    fn cancel(&self) -> Result<(), ActionError>;
}

impl<A: Action> DynAction for A {
    fn signature(&self) -> Signature {
        Signature::of::<A::Params>()
    }

    fn is_asynchronous(&self, protocol: ProtocolVersion) -> bool {
        Action::is_asynchronous(self, protocol)
    }

    fn is_persistent(&self) -> bool {
        Action::is_persistent(self)
    }

    fn is_loggable(&self) -> bool {
        Action::is_loggable(self)
    }

    fn prepare(
        self: Arc<Self>,
        protocol: ProtocolVersion,
        arguments: Vec<Value>,
    ) -> Result<BoxFuture<'static, ActionResult>, BindError> {
        let params = binder::bind::<A::Params>(protocol, arguments)?;
        Ok(Box::pin(async move { Action::run(&*self, params).await }))
    }

    fn resume(self: Arc<Self>) -> BoxFuture<'static, ActionResult> {
        Box::pin(async move { Action::resume(&*self).await })
    }

    fn cancel(&self) -> Result<(), ActionError> {
        Action::cancel(self)
    }
}
