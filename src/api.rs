//! HTTP surface: send, on-demand receive-and-dispatch, and poll control.
//!
//! | Route | Result |
//! |---|---|
//! | `POST /message?queueName=` | 201 with the send receipt |
//! | `GET /message?queueName=` | 200 with the received batch; processing continues in the background |
//! | `POST /startPoll?queueName=` | 202 |
//! | `POST /stopPoll[?queueName=]` | 202 |
//! | `GET /health` | 200 |
//!
//! A 200 from `GET /message` means the messages were retrieved and handed to
//! workers, not that they were processed.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::errors::GatewayError;
use crate::gateway::{QueueGateway, ReceiveOptions};
use crate::receiver::{Dispatcher, PollRegistry};

mod handlers;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub polls: Arc<PollRegistry>,
    /// Options for the on-demand receive path.
    pub receive_options: ReceiveOptions,
    /// Delay hint passed with every send.
    pub send_delay: Duration,
}

impl AppState {
    pub fn gateway(&self) -> &dyn QueueGateway {
        self.dispatcher.gateway().as_ref()
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/message",
            get(handlers::receive_message).post(handlers::send_message),
        )
        .route("/startPoll", post(handlers::start_poll))
        .route("/stopPoll", post(handlers::stop_poll))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Url Param 'queueName' is missing")]
    MissingQueueName,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingQueueName | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Gateway(GatewayError::QueueNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Gateway(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, self.to_string()).into_response()
    }
}
