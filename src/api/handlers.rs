use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{ApiError, AppState};
use crate::gateway::SendReceipt;

#[derive(Debug, Default, Deserialize)]
pub struct QueueQuery {
    #[serde(rename = "queueName")]
    queue_name: Option<String>,
}

impl QueueQuery {
    fn queue_name(&self) -> Option<&str> {
        self.queue_name.as_deref().filter(|name| !name.is_empty())
    }

    fn require(&self) -> Result<&str, ApiError> {
        self.queue_name().ok_or(ApiError::MissingQueueName)
    }
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    message: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<SendReceipt>), ApiError> {
    let queue_name = query.require()?;
    let request: SendMessageRequest =
        serde_json::from_slice(&body).map_err(|err| ApiError::InvalidBody(err.to_string()))?;

    let gateway = state.gateway();
    let address = gateway.resolve_address(queue_name).await?;
    let receipt = gateway
        .send(&address, &request.message, state.send_delay)
        .await?;

    info!(queue = queue_name, message_id = %receipt.message_id, "message send succeeded");
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Receives one batch and dispatches a worker per message without waiting
/// for any of them.
pub async fn receive_message(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Value>, ApiError> {
    let queue_name = query.require()?;

    let gateway = state.gateway();
    let address = gateway.resolve_address(queue_name).await?;
    let batch = gateway.receive(&address, state.receive_options).await?;
    info!(queue = queue_name, count = batch.len(), "messages received");

    let response =
        serde_json::to_value(&batch).map_err(|err| ApiError::Internal(err.to_string()))?;

    let workers = state.dispatcher.dispatch_batch(&address, batch);
    info!(workers = workers.len(), "all messages dispatched for consumption");

    Ok(Json(response))
}

pub async fn start_poll(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> Result<StatusCode, ApiError> {
    let queue_name = query.require()?;
    state.polls.start(queue_name).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Stops the named queue's loop, or every loop when no name is given.
pub async fn stop_poll(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> Result<StatusCode, ApiError> {
    match query.queue_name() {
        Some(queue_name) => {
            state.polls.stop_queue(queue_name).await?;
        }
        None => {
            state.polls.stop_all();
        }
    }
    Ok(StatusCode::ACCEPTED)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "polling": state.polls.active(),
    }))
}
