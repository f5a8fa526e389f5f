use crate::*;

#[tokio::test]
async fn errand_exit_status_is_business_data() -> Result<()> {
    let agent = Agent::fresh("errand").await?;
    write_script(
        &agent.jobs_dir,
        "smoke-tests",
        "run",
        "#!/bin/sh\necho hello\necho oops >&2\nexit 3\n",
    );

    let id = agent.start_task("run_errand", vec![json!("smoke-tests")]).await?;
    let response = agent.wait_task(&id).await?;
    assert_eq!(
        response,
        json!({ "value": { "exit_code": 3, "stdout": "hello\n", "stderr": "oops\n" } })
    );

    // Terminal results don't change between polls.
    assert_eq!(agent.wait_task(&id).await?, response);
    Ok(())
}

#[tokio::test]
async fn canceled_errand_reports_its_exit_status() -> Result<()> {
    let agent = Agent::fresh("errand-cancel").await?;
    write_script(
        &agent.jobs_dir,
        "long",
        "run",
        "#!/bin/sh\ntrap 'echo stopping; exit 7' TERM\nwhile true; do sleep 0.1; done\n",
    );

    let id = agent.start_task("run_errand", vec![json!("long")]).await?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    for _ in 0..3 {
        let response = agent.send("cancel_task", vec![json!(id)]).await?;
        assert_eq!(response, json!({ "value": "canceled" }));
    }

    let response = agent.wait_task(&id).await?;
    assert_eq!(response["value"]["exit_code"], json!(7));
    assert_eq!(response["value"]["stdout"], json!("stopping\n"));
    Ok(())
}

#[tokio::test]
async fn missing_errand_fails_the_task() -> Result<()> {
    let agent = Agent::fresh("errand-missing").await?;
    let id = agent.start_task("run_errand", vec![json!("ghost")]).await?;
    let response = agent.wait_task(&id).await?;
    assert_eq!(
        exception(&response).map(str::to_string),
        Some(format!(
            "Task {id} result: Running errand: Could not find errand 'ghost'"
        ))
    );
    Ok(())
}

#[tokio::test]
async fn cancel_after_errand_finished_keeps_result() -> Result<()> {
    let agent = Agent::fresh("errand-cancel-done").await?;
    write_script(&agent.jobs_dir, "quick", "run", "#!/bin/sh\necho quick\nexit 0\n");

    let id = agent.start_task("run_errand", vec![json!("quick")]).await?;
    let finished = agent.wait_task(&id).await?;
    assert_eq!(
        finished,
        json!({ "value": { "exit_code": 0, "stdout": "quick\n", "stderr": "" } })
    );

    for _ in 0..3 {
        let response = agent.send("cancel_task", vec![json!(id)]).await?;
        assert_eq!(response, json!({ "value": "canceled" }));
    }

    assert_eq!(agent.wait_task(&id).await?, finished);
    Ok(())
}

#[tokio::test]
async fn canceling_errand_stops_its_background_children() -> Result<()> {
    let agent = Agent::fresh("errand-cancel-group").await?;
    write_script(
        &agent.jobs_dir,
        "spawner",
        "run",
        "#!/bin/sh\nsleep 30 &\necho started\nwait\n",
    );

    let id = agent.start_task("run_errand", vec![json!("spawner")]).await?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let started = std::time::Instant::now();
    let response = agent.send("cancel_task", vec![json!(id)]).await?;
    assert_eq!(response, json!({ "value": "canceled" }));

    let response = agent.wait_task(&id).await?;
    assert_eq!(response["value"]["exit_code"], json!(143));
    assert_eq!(response["value"]["stdout"], json!("started\n"));
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}
