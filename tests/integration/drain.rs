use crate::*;

#[tokio::test]
async fn drain_runs_every_script() -> Result<()> {
    let agent = Agent::fresh("drain").await?;
    let marker = agent.jobs_dir.join("drained");
    for job in ["web", "db", "worker"] {
        write_script(
            &agent.jobs_dir,
            job,
            "drain",
            &format!("#!/bin/sh\necho \"{job} $1\" >> {}\n", marker.display()),
        );
    }

    let id = agent.start_task("drain", vec![json!("shutdown")]).await?;
    let response = agent.wait_task(&id).await?;
    assert_eq!(response, json!({ "value": 0 }));

    let mut lines: Vec<String> = std::fs::read_to_string(&marker)?
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    assert_eq!(lines, vec!["db shutdown", "web shutdown", "worker shutdown"]);
    Ok(())
}

#[tokio::test]
async fn drain_failures_are_aggregated() -> Result<()> {
    let agent = Agent::fresh("drain-fail").await?;
    write_script(&agent.jobs_dir, "web", "drain", "#!/bin/sh\nexit 0\n");
    write_script(
        &agent.jobs_dir,
        "db",
        "drain",
        "#!/bin/sh\necho 'perm denied' >&2\nexit 1\n",
    );

    let id = agent.start_task("drain", vec![json!("update"), json!({})]).await?;
    let response = agent.wait_task(&id).await?;
    assert_eq!(
        exception(&response).map(str::to_string),
        Some(format!(
            "Task {id} result: '1' drain script(s) failed: Drain script for job 'db' exited with 1: perm denied\n"
        ))
    );
    Ok(())
}
