//! Outpost integration test harness.
//!
//! Every test starts its own agent in-process on an ephemeral port, with a
//! private jobs directory and state directory under the system temp dir, and
//! talks to it over real HTTP. Job scripts are real `/bin/sh` scripts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use outpost_actions::{actions, Dispatcher, ScriptLauncher, TaskLedger, TaskService};
use outpost_core::{AgentRequest, ProtocolVersion};

mod dispatch;
mod drain;
mod errands;
mod persistence;
mod scripts;

// ── Harness ───────────────────────────────────────────────────────────────────

static DIRS: AtomicUsize = AtomicUsize::new(0);

/// Fresh, empty directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "outpost-it-{tag}-{}-{}",
        std::process::id(),
        DIRS.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write an executable `<jobs>/<job>/bin/<script>`.
pub fn write_script(jobs_dir: &Path, job: &str, script: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = jobs_dir.join(job).join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let path = bin.join(script);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A running agent. Shuts down when dropped.
pub struct Agent {
    pub port: u16,
    pub jobs_dir: PathBuf,
    pub state_dir: PathBuf,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Agent {
    /// Start an agent over `jobs_dir`, keeping its ledger in `state_dir`.
    pub async fn start(jobs_dir: &Path, state_dir: &Path) -> Result<Self> {
        let ledger = TaskLedger::open(state_dir).await.context("opening ledger")?;
        let tasks = TaskService::new();
        let registry = actions::builtin(tasks.clone(), jobs_dir.to_path_buf(), Arc::new(ScriptLauncher))?;
        let dispatcher = Dispatcher::new(registry, tasks, ledger, ProtocolVersion(1));
        dispatcher.resume_persisted().await;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = outpost_api::ApiState { dispatcher };
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = outpost_api::serve_on(listener, state, shutdown).await {
                eprintln!("agent server failed: {e:#}");
            }
        });

        Ok(Self {
            port,
            jobs_dir: jobs_dir.to_path_buf(),
            state_dir: state_dir.to_path_buf(),
            client: reqwest::Client::new(),
            shutdown: Some(shutdown_tx),
        })
    }

    /// Fresh agent with empty jobs and state directories.
    pub async fn fresh(tag: &str) -> Result<Self> {
        let root = temp_dir(tag);
        let jobs = root.join("jobs");
        let state = root.join("state");
        std::fs::create_dir_all(&jobs)?;
        Self::start(&jobs, &state).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}/api{}", self.port, path)
    }

    /// POST a raw request, returning the response envelope.
    pub async fn post(&self, request: &AgentRequest) -> Result<Value> {
        let response = self
            .client
            .post(self.url("/agent"))
            .json(request)
            .send()
            .await
            .context("sending request")?;
        if !response.status().is_success() {
            bail!("unexpected status {}", response.status());
        }
        response.json().await.context("decoding response")
    }

    pub async fn send(&self, method: &str, arguments: Vec<Value>) -> Result<Value> {
        self.post(&AgentRequest::new(method, arguments)).await
    }

    pub async fn send_with(&self, method: &str, arguments: Vec<Value>, protocol: u32) -> Result<Value> {
        self.post(&AgentRequest::new(method, arguments).with_protocol(ProtocolVersion(protocol)))
            .await
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.client
            .get(self.url(path))
            .send()
            .await?
            .json()
            .await
            .context("decoding response")
    }

    /// Start an asynchronous action and return its task id.
    pub async fn start_task(&self, method: &str, arguments: Vec<Value>) -> Result<String> {
        let response = self.send(method, arguments).await?;
        task_id(&response)
    }

    /// Poll `get_task` until the task leaves `running`; returns the final envelope.
    pub async fn wait_task(&self, id: &str) -> Result<Value> {
        for _ in 0..300 {
            let response = self.send("get_task", vec![json!(id)]).await?;
            if response["value"]["state"] != json!("running") {
                return Ok(response);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        bail!("task {id} still running")
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// The task id out of a `{"value": {"agent_task_id": ..}}` envelope.
pub fn task_id(response: &Value) -> Result<String> {
    if response["value"]["state"] != json!("running") {
        bail!("expected a running task, got {response}");
    }
    response["value"]["agent_task_id"]
        .as_str()
        .map(str::to_string)
        .context("missing agent_task_id")
}

/// The exception message of an envelope, if any.
pub fn exception(response: &Value) -> Option<&str> {
    response["exception"]["message"].as_str()
}
