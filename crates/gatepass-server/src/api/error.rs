//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body extractor whose rejections use the standard error body.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 400 Bad Request - Required fields were missing.
    MissingFields {
        /// Human-readable error message.
        message: String,
        /// Names of the missing fields.
        fields: Vec<String>,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 409 Conflict - The pass changed while the request was in flight.
    Conflict {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Underlying cause, for diagnostics.
        details: Option<String>,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "missing_fields",
    "message": "Missing required fields: phone, hostName",
    "details": { "fields": ["phone", "hostName"] }
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "pass_not_found").
    #[schema(example = "pass_not_found")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "Visitor not found")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest {
                error_code,
                message,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::MissingFields { message, fields } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "missing_fields".to_string(),
                    message,
                    details: Some(serde_json::json!({ "fields": fields })),
                },
            ),

            Self::NotFound {
                error_code,
                message,
            } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::Conflict {
                error_code,
                message,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::InternalError {
                error_code,
                message,
                details,
            } => {
                // Log internal errors
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    details = ?details,
                    "Internal server error"
                );

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: details.map(|d| serde_json::json!(d)),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } | Self::MissingFields { message, .. } => {
                write!(f, "Bad Request: {message}")
            }
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
            Self::InternalError { message, .. } => {
                write!(f, "Internal Error: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from gatepass_core errors.
impl From<gatepass_core::GatepassError> for ApiError {
    fn from(err: gatepass_core::GatepassError) -> Self {
        use gatepass_core::GatepassError;

        match &err {
            GatepassError::MissingFields(fields) => Self::MissingFields {
                message: err.to_string(),
                fields: fields.iter().map(ToString::to_string).collect(),
            },
            _ if err.is_validation_error() => Self::BadRequest {
                error_code: err.error_code().to_lowercase(),
                message: err.to_string(),
            },
            GatepassError::PassNotFound(_) => Self::NotFound {
                error_code: "pass_not_found".to_string(),
                message: "Visitor not found".to_string(),
            },
            GatepassError::ConcurrentUpdate { .. } => Self::Conflict {
                error_code: "concurrent_update".to_string(),
                message: err.to_string(),
            },
            _ => Self::InternalError {
                error_code: err.error_code().to_lowercase(),
                message: "Server Error".to_string(),
                details: Some(err.to_string()),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            error_code: "invalid_body".to_string(),
            message: rejection.body_text(),
        }
    }
}
