//! ping, send, task, cancel, wait commands.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use outpost_core::{AgentRequest, AgentResponse, ProtocolVersion};

use super::http::send;

const WAIT_INTERVAL: Duration = Duration::from_millis(500);

/// Parse a CLI argument as JSON, falling back to a plain string.
pub fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_response(response: &AgentResponse) -> Result<()> {
    match response {
        AgentResponse::Value { value } => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
        AgentResponse::Exception { exception } => bail!("{}", exception.message),
    }
}

fn is_running(response: &AgentResponse) -> bool {
    response
        .as_value()
        .and_then(|v| v.get("state"))
        .and_then(Value::as_str)
        == Some("running")
}

pub async fn cmd_ping(port: u16) -> Result<()> {
    let response = send(port, &AgentRequest::new("ping", vec![])).await?;
    print_response(&response)
}

pub async fn cmd_send(
    port: u16,
    method: &str,
    args: &[&str],
    protocol: Option<ProtocolVersion>,
) -> Result<()> {
    let arguments = args.iter().map(|a| parse_arg(a)).collect();
    let mut request = AgentRequest::new(method, arguments);
    if let Some(protocol) = protocol {
        request = request.with_protocol(protocol);
    }
    let response = send(port, &request).await?;
    print_response(&response)
}

pub async fn cmd_task(port: u16, id: &str) -> Result<()> {
    let response = send(port, &AgentRequest::new("get_task", vec![id.into()])).await?;
    print_response(&response)
}

pub async fn cmd_cancel(port: u16, id: &str) -> Result<()> {
    let response = send(port, &AgentRequest::new("cancel_task", vec![id.into()])).await?;
    print_response(&response)
}

/// Poll `get_task` until the task is no longer running.
pub async fn cmd_wait(port: u16, id: &str) -> Result<()> {
    loop {
        let response = send(port, &AgentRequest::new("get_task", vec![id.into()]))
            .await
            .with_context(|| format!("polling task {id}"))?;
        if !is_running(&response) {
            return print_response(&response);
        }
        tokio::time::sleep(WAIT_INTERVAL).await;
    }
}
