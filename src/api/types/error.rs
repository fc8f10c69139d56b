//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::chain::StepResult;
use crate::domain::{DomainError, UpstreamErrorKind};

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    AuthenticationError,
    NotFoundError,
    RateLimitError,
    ServerError,
    UpstreamError,
    TimeoutError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::AuthenticationError => write!(f, "authentication_error"),
            Self::NotFoundError => write!(f, "not_found_error"),
            Self::RateLimitError => write!(f, "rate_limit_error"),
            Self::ServerError => write!(f, "server_error"),
            Self::UpstreamError => write!(f, "upstream_error"),
            Self::TimeoutError => write!(f, "timeout_error"),
        }
    }
}

/// Error body: `{ "error", "type", "partialResults"? }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_results: Option<Vec<StepResult>>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: message.into(),
                error_type,
                partial_results: None,
            },
        }
    }

    /// Attach the results of the steps that completed before a failure
    pub fn with_partial_results(mut self, results: Vec<StepResult>) -> Self {
        self.response.partial_results = Some(results);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidRequestError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ApiErrorType::AuthenticationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiErrorType::NotFoundError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiErrorType::ServerError, message)
    }

    /// A chain run stopped at a failing step
    ///
    /// Always a 500, whatever the upstream cause, carrying the partial trail.
    pub fn step_failed(cause: Option<&DomainError>, partial_results: Vec<StepResult>) -> Self {
        let detail = cause
            .map(user_message)
            .unwrap_or_else(|| "Unknown error".to_string());

        Self::internal(format!("Error processing input: {}", detail))
            .with_partial_results(partial_results)
    }
}

/// User-facing wording for a domain error; upstream details are wrapped
pub fn user_message(err: &DomainError) -> String {
    match err {
        DomainError::Upstream { kind, message } => match kind {
            UpstreamErrorKind::BadRequest => format!("Invalid request: {}", message),
            UpstreamErrorKind::Unauthorized => {
                "Invalid API key. Please check your OpenAI API key.".to_string()
            }
            UpstreamErrorKind::RateLimited => {
                "Rate limit exceeded. Please try again later.".to_string()
            }
            UpstreamErrorKind::ServerError => format!("OpenAI server error: {}", message),
            UpstreamErrorKind::Timeout => {
                "The completion service did not respond in time.".to_string()
            }
            UpstreamErrorKind::Network
            | UpstreamErrorKind::MalformedResponse
            | UpstreamErrorKind::Other => format!("Completion service error: {}", message),
        },
        DomainError::NotFound { message }
        | DomainError::Validation { message }
        | DomainError::Configuration { message } => message.clone(),
        DomainError::Storage { .. } | DomainError::Cache { .. } | DomainError::Internal { .. } => {
            "Internal server error".to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let message = user_message(&err);

        match &err {
            DomainError::NotFound { .. } => Self::not_found(message),
            DomainError::Validation { .. } => Self::bad_request(message),
            DomainError::Upstream { kind, .. } => match kind {
                UpstreamErrorKind::BadRequest => Self::bad_request(message),
                UpstreamErrorKind::Unauthorized => Self::unauthorized(message),
                UpstreamErrorKind::RateLimited => Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    ApiErrorType::RateLimitError,
                    message,
                ),
                UpstreamErrorKind::ServerError => Self::internal(message),
                UpstreamErrorKind::Timeout => {
                    Self::new(StatusCode::GATEWAY_TIMEOUT, ApiErrorType::TimeoutError, message)
                }
                UpstreamErrorKind::Network
                | UpstreamErrorKind::MalformedResponse
                | UpstreamErrorKind::Other => {
                    Self::new(StatusCode::BAD_GATEWAY, ApiErrorType::UpstreamError, message)
                }
            },
            DomainError::Configuration { .. } => Self::internal(message),
            DomainError::Storage { .. } | DomainError::Cache { .. } | DomainError::Internal { .. } => {
                tracing::error!(error = %err, "Request failed with internal error");
                Self::internal(message)
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.response.error_type, self.response.error)
    }
}

impl std::error::Error for ApiError {}
