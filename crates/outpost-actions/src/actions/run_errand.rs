//! `run_errand`: supervises one job's `bin/run` script.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Serialize;

use outpost_core::ProtocolVersion;

use crate::action::{Action, ActionResult};
use crate::binder::Rest;
use crate::cancel::CancelSlot;
use crate::error::ActionError;
use crate::jobs::{is_file, script_path, scripts_named, validate_name};
use crate::process::{Command, Launcher};

/// How long a canceled errand gets between SIGTERM and SIGKILL.
pub const ERRAND_GRACE_PERIOD: Duration = Duration::from_secs(10);

const ERRAND_SCRIPT: &str = "run";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

pub struct RunErrandAction {
    jobs_dir: PathBuf,
    launcher: Arc<dyn Launcher>,
    // Created up front so a cancel that lands before `run` is not lost.
    cancel: CancelSlot,
}

impl RunErrandAction {
    pub fn new(jobs_dir: PathBuf, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            jobs_dir,
            launcher,
            cancel: CancelSlot::new(),
        }
    }

    /// Named errand, or the only job that has one when no name is given.
    fn errand_script(&self, names: &[String]) -> anyhow::Result<PathBuf> {
        if let Some(name) = names.first() {
            validate_name("errand", name)?;
            let path = script_path(&self.jobs_dir, name, ERRAND_SCRIPT);
            if !is_file(&path) {
                bail!("Could not find errand '{name}'");
            }
            return Ok(path);
        }

        let scripts = scripts_named(&self.jobs_dir, ERRAND_SCRIPT)?;
        match scripts.as_slice() {
            [only] => Ok(only.path.clone()),
            [] => bail!("No errand found in {}", self.jobs_dir.display()),
            many => {
                let jobs: Vec<&str> = many.iter().map(|s| s.job.as_str()).collect();
                bail!("Errand name required, found: {}", jobs.join(", "))
            }
        }
    }
}

impl Action for RunErrandAction {
    type Params = (Rest<String>,);

    async fn run(&self, (Rest(names),): Self::Params) -> ActionResult {
        let path = self
            .errand_script(&names)
            .context("Running errand")?;

        let mut process = self
            .launcher
            .start(&Command::new(&path))
            .context("Running errand")?;
        tracing::info!(errand = %path.display(), "errand started");

        let finished = tokio::select! {
            outcome = process.wait() => Some(outcome),
            _ = self.cancel.requested() => None,
        };

        let outcome = match finished {
            Some(outcome) => outcome,
            None => {
                tracing::info!(errand = %path.display(), grace = ?ERRAND_GRACE_PERIOD, "canceling errand");
                process
                    .terminate_nicely(ERRAND_GRACE_PERIOD)
                    .context("Canceling errand")?;
                process.wait().await
            }
        };
        let outcome = outcome.context("Running errand")?;

        tracing::info!(errand = %path.display(), exit_code = outcome.exit_status, "errand finished");
        let result = ErrandResult {
            exit_code: outcome.exit_status,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
        };
        serde_json::to_value(result).map_err(ActionError::msg)
    }

    fn is_asynchronous(&self, _protocol: ProtocolVersion) -> bool {
        true
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn is_loggable(&self) -> bool {
        true
    }

    fn cancel(&self) -> Result<(), ActionError> {
        if !self.cancel.request() {
            tracing::debug!("errand cancellation already pending");
        }
        Ok(())
    }
}
