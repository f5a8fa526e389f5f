use crate::*;

#[tokio::test]
async fn ping_answers_pong() -> Result<()> {
    let agent = Agent::fresh("ping").await?;
    let response = agent.send("ping", vec![]).await?;
    assert_eq!(response, json!({ "value": "pong" }));
    Ok(())
}

#[tokio::test]
async fn unknown_method_is_an_in_band_exception() -> Result<()> {
    let agent = Agent::fresh("unknown").await?;
    let response = agent.send("format_disk", vec![]).await?;
    assert_eq!(exception(&response), Some("unknown message format_disk"));
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_an_in_band_exception() -> Result<()> {
    let agent = Agent::fresh("malformed").await?;
    let response = reqwest::Client::new()
        .post(agent.url("/agent"))
        .header("content-type", "application/json")
        .body("{\"arguments\": []}")
        .send()
        .await?;
    assert!(response.status().is_success());
    let body: Value = response.json().await?;
    let message = exception(&body).context("expected exception")?;
    assert!(message.starts_with("Decoding request: "), "{message}");
    Ok(())
}

#[tokio::test]
async fn protocol_version_is_injected() -> Result<()> {
    let agent = Agent::fresh("info").await?;
    let response = agent.send_with("info", vec![json!(7)], 5).await?;
    assert_eq!(response["value"]["protocol"], json!(5));
    Ok(())
}

#[tokio::test]
async fn get_task_for_unknown_id() -> Result<()> {
    let agent = Agent::fresh("get-task").await?;
    let response = agent.send("get_task", vec![json!("missing-id")]).await?;
    assert_eq!(
        exception(&response),
        Some("Task with id missing-id could not be found")
    );
    Ok(())
}

#[tokio::test]
async fn bind_errors_are_reported() -> Result<()> {
    let agent = Agent::fresh("bind").await?;

    let response = agent.send("cancel_task", vec![]).await?;
    assert_eq!(
        exception(&response),
        Some("Not enough arguments, expected 1, got 0")
    );

    let response = agent.send("get_task", vec![json!({ "id": 1 })]).await?;
    let message = exception(&response).context("expected exception")?;
    assert!(message.starts_with("Converting argument 0 to "), "{message}");

    // Extra trailing arguments are ignored.
    let response = agent.send("ping", vec![json!(1), json!("two")]).await?;
    assert_eq!(response, json!({ "value": "pong" }));
    Ok(())
}

#[tokio::test]
async fn tasks_endpoint_lists_tasks() -> Result<()> {
    let agent = Agent::fresh("tasks").await?;
    write_script(&agent.jobs_dir, "web", "drain", "#!/bin/sh\nexit 0\n");

    let id = agent.start_task("drain", vec![json!("status")]).await?;
    agent.wait_task(&id).await?;

    let tasks = agent.get("/tasks").await?;
    let tasks = tasks.as_array().context("expected array")?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], json!(id));
    assert_eq!(tasks[0]["method"], json!("drain"));
    assert_eq!(tasks[0]["state"], json!("done"));
    Ok(())
}
