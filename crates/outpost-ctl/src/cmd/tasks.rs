//! tasks command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
#[allow(dead_code)]
struct TaskInfo {
    id: String,
    method: String,
    state: String,
    started_at: u64,
    updated_at: u64,
    #[serde(default)]
    error: Option<String>,
}

pub async fn cmd_tasks(port: u16) -> Result<()> {
    let tasks: Vec<TaskInfo> = get_json(&format!("{}/tasks", base_url(port))).await?;

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Tasks ({})", tasks.len());
    println!("═══════════════════════════════════════");
    for t in &tasks {
        println!("  ┌─ {}", t.id);
        println!("  │  method : {}", t.method);
        match &t.error {
            Some(error) => {
                println!("  │  state  : {}", t.state);
                println!("  └─ error  : {}", error);
            }
            None => println!("  └─ state  : {}", t.state),
        }
    }
    Ok(())
}
