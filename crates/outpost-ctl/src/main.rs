//! outpost-ctl: command-line interface for the Outpost agent.

mod cmd;

use anyhow::{Context, Result};

use outpost_core::ProtocolVersion;

const DEFAULT_PORT: u16 = 6868;

fn print_usage() {
    println!("Usage: outpost-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  ping                              Check the agent is alive");
    println!("  send <method> [arg...]            Send a command; args are JSON or plain strings");
    println!("  task <id>                         Show a task's state or result");
    println!("  cancel <id>                       Request cancellation of a task");
    println!("  wait <id>                         Poll a task until it finishes");
    println!("  tasks                             List every task");
    println!();
    println!("Options:");
    println!("  --port <port>       Agent API port (default: {})", DEFAULT_PORT);
    println!("  --protocol <n>      Protocol version for send");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = DEFAULT_PORT;
    let mut protocol = None;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                port = args
                    .get(i)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port must be a number")?;
            }
            "--protocol" => {
                i += 1;
                let version: u32 = args
                    .get(i)
                    .context("--protocol requires a value")?
                    .parse()
                    .context("--protocol must be a number")?;
                protocol = Some(ProtocolVersion(version));
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["ping"] | [] => cmd::agent::cmd_ping(port).await,
        ["send", method, args @ ..] => cmd::agent::cmd_send(port, method, args, protocol).await,
        ["task", id] => cmd::agent::cmd_task(port, id).await,
        ["cancel", id] => cmd::agent::cmd_cancel(port, id).await,
        ["wait", id] => cmd::agent::cmd_wait(port, id).await,
        ["tasks"] => cmd::tasks::cmd_tasks(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
