//! /agent: the orchestrator's command endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use outpost_core::{AgentRequest, AgentResponse};

use super::ApiState;

/// Always answers 200; failures travel in the `exception` envelope.
pub async fn handle_agent(State(state): State<ApiState>, body: Bytes) -> Json<AgentResponse> {
    let request: AgentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "malformed agent request");
            return Json(AgentResponse::exception(format!("Decoding request: {e}")));
        }
    };
    Json(state.dispatcher.dispatch(request).await)
}
