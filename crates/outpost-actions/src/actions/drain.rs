//! `drain`: runs every job's `bin/drain` script before an update or shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::{json, Value};

use outpost_core::ProtocolVersion;

use crate::action::{Action, ActionResult};
use crate::binder::{Arg, Rest};
use crate::error::ActionError;
use crate::fan_out;
use crate::jobs::scripts_named;
use crate::process::{Command, Launcher};

const DRAIN_SCRIPT: &str = "drain";
const DRAIN_TYPES: [&str; 3] = ["update", "shutdown", "status"];

pub struct DrainAction {
    jobs_dir: PathBuf,
    launcher: Arc<dyn Launcher>,
}

impl DrainAction {
    pub fn new(jobs_dir: PathBuf, launcher: Arc<dyn Launcher>) -> Self {
        Self { jobs_dir, launcher }
    }
}

impl Action for DrainAction {
    /// Drain type, then any new job specs (passed through untouched).
    type Params = (Arg<String>, Rest<Value>);

    async fn run(&self, (Arg(drain_type), Rest(new_specs)): Self::Params) -> ActionResult {
        if !DRAIN_TYPES.contains(&drain_type.as_str()) {
            return Err(ActionError::msg(format!("Unknown drain type '{drain_type}'")));
        }

        let scripts = scripts_named(&self.jobs_dir, DRAIN_SCRIPT).context("Finding drain scripts")?;
        tracing::info!(
            drain_type = %drain_type,
            scripts = scripts.len(),
            new_specs = new_specs.len(),
            "draining jobs"
        );

        let units = scripts.into_iter().map(|script| {
            let launcher = self.launcher.clone();
            let command = Command::new(&script.path).arg(&drain_type);
            async move {
                let outcome = launcher.run(&command).await?;
                if !outcome.success() {
                    bail!(
                        "Drain script for job '{}' exited with {}: {}",
                        script.job,
                        outcome.exit_status,
                        outcome.stderr.trim()
                    );
                }
                tracing::debug!(job = %script.job, "drain script finished");
                Ok(())
            }
        });

        fan_out::run_all("drain script", units)
            .await
            .map_err(ActionError::msg)?;
        Ok(json!(0))
    }

    fn is_asynchronous(&self, _protocol: ProtocolVersion) -> bool {
        true
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn is_loggable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{jobs_dir, write_script};
    use crate::process::testing::{outcome, Behavior, FakeLauncher};
    use crate::runner;

    async fn drain(dir: &std::path::Path, launcher: &Arc<FakeLauncher>, args: Vec<Value>) -> ActionResult {
        let action = Arc::new(DrainAction::new(dir.to_path_buf(), launcher.clone()));
        runner::run(action, ProtocolVersion(1), args).await
    }

    #[tokio::test]
    async fn every_drain_script_runs_with_the_drain_type() {
        let dir = jobs_dir("drain");
        let web = write_script(&dir, "web", "drain", "#!/bin/sh\n");
        let db = write_script(&dir, "db", "drain", "#!/bin/sh\n");
        write_script(&dir, "worker", "run", "#!/bin/sh\n");
        let launcher = Arc::new(FakeLauncher::new());

        let value = drain(&dir, &launcher, vec![json!("shutdown")]).await.unwrap();
        assert_eq!(value, json!(0));

        let mut started = launcher.started_programs();
        started.sort();
        assert_eq!(started, vec![db, web]);
        for command in launcher.started.lock().unwrap().iter() {
            assert_eq!(command.args, vec!["shutdown".to_string()]);
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn one_failure_is_aggregated() {
        let dir = jobs_dir("drain");
        write_script(&dir, "web", "drain", "#!/bin/sh\n");
        let db = write_script(&dir, "db", "drain", "#!/bin/sh\n");
        let launcher = Arc::new(FakeLauncher::new());
        launcher.on(&db, Behavior::Exit(outcome(1, "", "perm denied\n")));

        let err = drain(&dir, &launcher, vec![json!("update"), json!({ "jobs": [] })])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "'1' drain script(s) failed: Drain script for job 'db' exited with 1: perm denied\n"
        );
        assert_eq!(launcher.started_programs().len(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn launch_failures_are_aggregated_too() {
        let dir = jobs_dir("drain");
        let web = write_script(&dir, "web", "drain", "#!/bin/sh\n");
        let db = write_script(&dir, "db", "drain", "#!/bin/sh\n");
        let launcher = Arc::new(FakeLauncher::new());
        launcher.on(&web, Behavior::LaunchError("perm denied".into()));
        launcher.on(&db, Behavior::LaunchError("perm denied".into()));

        let err = drain(&dir, &launcher, vec![json!("status")]).await.unwrap_err();
        assert!(err.to_string().starts_with("'2' drain script(s) failed: "));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn no_drain_scripts_succeeds() {
        let dir = jobs_dir("drain");
        let launcher = Arc::new(FakeLauncher::new());
        assert_eq!(drain(&dir, &launcher, vec![json!("update")]).await.unwrap(), json!(0));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unknown_drain_type_is_rejected() {
        let launcher = Arc::new(FakeLauncher::new());
        let err = drain(std::path::Path::new("/nonexistent"), &launcher, vec![json!("reboot")])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown drain type 'reboot'");
    }

    #[tokio::test]
    async fn resume_is_not_supported() {
        let launcher = Arc::new(FakeLauncher::new());
        let action = Arc::new(DrainAction::new("/nonexistent".into(), launcher));
        assert_eq!(runner::resume(action).await, Err(ActionError::NotSupported));
    }
}
