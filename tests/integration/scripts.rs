use crate::*;

#[tokio::test]
async fn run_script_is_synchronous_before_protocol_three() -> Result<()> {
    let agent = Agent::fresh("script-sync").await?;
    let marker = agent.jobs_dir.join("env");
    write_script(
        &agent.jobs_dir,
        "web",
        "pre-start",
        &format!("#!/bin/sh\necho \"$DEPLOYMENT\" > {}\n", marker.display()),
    );

    let response = agent
        .send_with(
            "run_script",
            vec![json!("pre-start"), json!({ "env": { "DEPLOYMENT": "prod" } })],
            2,
        )
        .await?;
    assert_eq!(response, json!({ "value": "executed" }));
    assert_eq!(std::fs::read_to_string(&marker)?, "prod\n");
    Ok(())
}

#[tokio::test]
async fn run_script_is_a_task_from_protocol_three() -> Result<()> {
    let agent = Agent::fresh("script-async").await?;
    write_script(&agent.jobs_dir, "web", "post-start", "#!/bin/sh\nexit 0\n");

    let response = agent
        .send_with("run_script", vec![json!("post-start"), json!({})], 3)
        .await?;
    let id = task_id(&response)?;
    assert_eq!(agent.wait_task(&id).await?, json!({ "value": "executed" }));
    Ok(())
}

#[tokio::test]
async fn run_script_failures_are_aggregated() -> Result<()> {
    let agent = Agent::fresh("script-fail").await?;
    write_script(&agent.jobs_dir, "web", "post-start", "#!/bin/sh\nexit 4\n");
    write_script(&agent.jobs_dir, "db", "post-start", "#!/bin/sh\nexit 4\n");

    let response = agent
        .send("run_script", vec![json!("post-start"), json!({})])
        .await?;
    let message = exception(&response).context("expected exception")?;
    assert!(message.starts_with("'2' script(s) failed: "), "{message}");
    Ok(())
}
