//! Built-in actions.

mod cancel_task;
mod drain;
mod get_task;
mod info;
mod ping;
mod run_errand;
mod run_script;

use std::path::PathBuf;
use std::sync::Arc;

pub use cancel_task::CancelTaskAction;
pub use drain::DrainAction;
pub use get_task::{GetTaskAction, MAX_EMBEDDED_MESSAGE};
pub use info::{InfoAction, API_VERSION};
pub use ping::PingAction;
pub use run_errand::{ErrandResult, RunErrandAction, ERRAND_GRACE_PERIOD};
pub use run_script::{RunScriptAction, RunScriptOptions, ASYNC_SINCE};

use crate::process::Launcher;
use crate::registry::{ActionRegistry, RegistryError};
use crate::task::TaskService;

/// Registry holding every built-in action.
pub fn builtin(
    tasks: TaskService,
    jobs_dir: PathBuf,
    launcher: Arc<dyn Launcher>,
) -> Result<ActionRegistry, RegistryError> {
    let mut registry = ActionRegistry::new();

    registry.register("ping", || PingAction)?;
    registry.register("info", || InfoAction)?;

    let t = tasks.clone();
    registry.register("get_task", move || GetTaskAction::new(t.clone()))?;
    registry.register("cancel_task", move || CancelTaskAction::new(tasks.clone()))?;

    let (dir, l) = (jobs_dir.clone(), launcher.clone());
    registry.register("run_errand", move || RunErrandAction::new(dir.clone(), l.clone()))?;
    let (dir, l) = (jobs_dir.clone(), launcher.clone());
    registry.register("drain", move || DrainAction::new(dir.clone(), l.clone()))?;
    registry.register("run_script", move || {
        RunScriptAction::new(jobs_dir.clone(), launcher.clone())
    })?;

    Ok(registry)
}
