use crate::*;

#[tokio::test]
async fn unfinished_drain_is_resumed_after_restart() -> Result<()> {
    let root = temp_dir("resume");
    let jobs = root.join("jobs");
    let state = root.join("state");
    std::fs::create_dir_all(&jobs)?;
    std::fs::create_dir_all(&state)?;
    std::fs::write(
        state.join("tasks.json"),
        r#"[{ "id": "abc123", "method": "drain" }]"#,
    )?;

    let agent = Agent::start(&jobs, &state).await?;

    // Drain can't pick up where it left off; the resumed task says so.
    let response = agent.wait_task("abc123").await?;
    assert_eq!(
        exception(&response),
        Some("Task abc123 result: not supported")
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    let ledger: Value = serde_json::from_str(&std::fs::read_to_string(state.join("tasks.json"))?)?;
    assert_eq!(ledger, json!([]));
    Ok(())
}

#[tokio::test]
async fn running_drain_is_recorded_in_the_ledger() -> Result<()> {
    let agent = Agent::fresh("ledger").await?;
    let release = agent.jobs_dir.join("release");
    write_script(
        &agent.jobs_dir,
        "web",
        "drain",
        &format!(
            "#!/bin/sh\nwhile [ ! -f {} ]; do sleep 0.05; done\n",
            release.display()
        ),
    );

    let id = agent.start_task("drain", vec![json!("shutdown")]).await?;
    let ledger: Value =
        serde_json::from_str(&std::fs::read_to_string(agent.state_dir.join("tasks.json"))?)?;
    assert_eq!(ledger, json!([{ "id": id, "method": "drain" }]));

    std::fs::write(&release, "")?;
    assert_eq!(agent.wait_task(&id).await?, json!({ "value": 0 }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let ledger: Value =
        serde_json::from_str(&std::fs::read_to_string(agent.state_dir.join("tasks.json"))?)?;
    assert_eq!(ledger, json!([]));
    Ok(())
}
