//! outpost-actions: action dispatch and asynchronous task execution.
//!
//! A request names an action and carries untyped positional arguments.
//! The [`binder`] matches them against the action's declared parameters,
//! the [`dispatch::Dispatcher`] runs synchronous actions inline, and the
//! [`task::TaskService`] runs asynchronous ones in the background while
//! callers poll and cancel them.

pub mod action;
pub mod actions;
pub mod binder;
pub mod cancel;
pub mod dispatch;
pub mod error;
pub mod fan_out;
pub mod jobs;
pub mod ledger;
pub mod process;
pub mod registry;
pub mod runner;
pub mod task;

pub use action::{Action, ActionResult, DynAction};
pub use binder::{Arg, Rest};
pub use dispatch::Dispatcher;
pub use error::{ActionError, BindError};
pub use ledger::TaskLedger;
pub use process::{Launcher, ScriptLauncher};
pub use registry::{ActionRegistry, RegistryError};
pub use task::{Task, TaskService, TaskState};
