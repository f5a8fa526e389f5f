//! `run_script`: runs a named script in every job that ships one.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::json;

use outpost_core::ProtocolVersion;

use crate::action::{Action, ActionResult};
use crate::binder::Arg;
use crate::error::ActionError;
use crate::fan_out;
use crate::jobs::scripts_named;
use crate::process::{Command, Launcher};

/// From this protocol version on, `run_script` runs as a task.
pub const ASYNC_SINCE: ProtocolVersion = ProtocolVersion(3);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunScriptOptions {
    /// Extra environment for every script.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

pub struct RunScriptAction {
    jobs_dir: PathBuf,
    launcher: Arc<dyn Launcher>,
}

impl RunScriptAction {
    pub fn new(jobs_dir: PathBuf, launcher: Arc<dyn Launcher>) -> Self {
        Self { jobs_dir, launcher }
    }
}

impl Action for RunScriptAction {
    type Params = (Arg<String>, Arg<RunScriptOptions>);

    async fn run(&self, (Arg(name), Arg(options)): Self::Params) -> ActionResult {
        let scripts = scripts_named(&self.jobs_dir, &name)
            .with_context(|| format!("Finding '{name}' scripts"))?;
        tracing::info!(script = %name, jobs = scripts.len(), "running job scripts");

        let units = scripts.into_iter().map(|script| {
            let launcher = self.launcher.clone();
            let command = options
                .env
                .iter()
                .fold(Command::new(&script.path), |command, (key, value)| {
                    command.env(key, value)
                });
            async move {
                let outcome = launcher.run(&command).await?;
                if !outcome.success() {
                    bail!(
                        "Script '{}' for job '{}' exited with {}",
                        command.program.display(),
                        script.job,
                        outcome.exit_status
                    );
                }
                Ok(())
            }
        });

        fan_out::run_all("script", units)
            .await
            .map_err(ActionError::msg)?;
        Ok(json!("executed"))
    }

    fn is_asynchronous(&self, protocol: ProtocolVersion) -> bool {
        protocol >= ASYNC_SINCE
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn is_loggable(&self) -> bool {
        true
    }
}
