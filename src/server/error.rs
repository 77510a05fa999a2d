use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::lobby::LobbyError;

const LOG_TARGET: &str = "server::error";

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    Internal(String),
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<LobbyError> for ApiError {
    fn from(err: LobbyError) -> Self {
        match err {
            LobbyError::NotFound(_) => ApiError::NotFound,
            LobbyError::InvariantViolation(_)
            | LobbyError::Storage(_)
            | LobbyError::Broadcast(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Internal(message) => {
                error!(target = LOG_TARGET, %message, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}
