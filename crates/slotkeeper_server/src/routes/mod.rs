pub mod events;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;
use slotkeeper_core::EventServiceError;
use tokio::task::JoinError;

/// Standard API error body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request failure with the status it maps to
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Client mistakes become 400 with the service message; storage failures 500.
impl From<EventServiceError> for ApiError {
    fn from(err: EventServiceError) -> Self {
        if err.is_client_error() {
            return Self::bad_request(err.to_string());
        }
        error!("event=api_request module=server status=error error={err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        error!("event=api_request module=server status=error error_code=store_task_failed error={err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "event store task failed".to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
