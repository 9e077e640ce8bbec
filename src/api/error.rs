//! API error type and its JSON rendering.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pipeline_agentic::{AgentError, ConfigError};
use serde_json::json;
use thiserror::Error;

use super::types::TaskResponse;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable `Authorization: Bearer` header
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid API key")]
    InvalidApiKey,

    /// Body could not be decoded
    #[error("{message}")]
    InvalidRequest { status: StatusCode, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid connection_url: {0}")]
    InvalidConnection(String),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::FORBIDDEN,
            Self::InvalidApiKey => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest { status, .. } => *status,
            Self::Config(ConfigError::HttpClient(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) | Self::InvalidConnection(_) => StatusCode::BAD_REQUEST,
            Self::Agent(AgentError::IterationLimit { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Agent(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::NotAuthenticated | Self::InvalidApiKey => "HTTP Exception",
            Self::InvalidRequest { .. } => "Invalid Request",
            Self::Config(ConfigError::HttpClient(_)) => "Internal Error",
            Self::Config(_) | Self::InvalidConnection(_) => "Configuration Error",
            Self::Agent(AgentError::IterationLimit { .. }) => "Iteration Limit",
            Self::Agent(_) => "Internal Error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let data = match &self {
            Self::Agent(AgentError::IterationLimit {
                iterations,
                last_feedback,
            }) => json!({
                "message": self.to_string(),
                "iterations": iterations,
                "last_feedback": last_feedback,
            }),
            _ => json!(self.to_string()),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status.as_u16(), self);
        }

        (status, Json(TaskResponse::error(self.category(), data))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_agentic::GenerationError;

    #[test]
    fn test_status_and_category() {
        let cases = [
            (ApiError::NotAuthenticated, StatusCode::FORBIDDEN, "HTTP Exception"),
            (ApiError::InvalidApiKey, StatusCode::UNAUTHORIZED, "HTTP Exception"),
            (
                ApiError::Config(ConfigError::UnknownModel("x".into())),
                StatusCode::BAD_REQUEST,
                "Configuration Error",
            ),
            (
                ApiError::Agent(AgentError::IterationLimit {
                    iterations: 10,
                    last_feedback: None,
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
                "Iteration Limit",
            ),
            (
                ApiError::Agent(AgentError::Generation(GenerationError::EmptyCompletion)),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Error",
            ),
        ];
        for (err, status, category) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.category(), category);
        }
    }
}
