use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A transport failure reaching the spreadsheet endpoint.
    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// An upstream reply that does not have the expected shape.
    #[error("Upstream parse error: {0}")]
    UpstreamParse(String),

    /// An authorization error.
    #[error("Access denied for role {user_role}, requires {required_role}")]
    Forbidden {
        required_role: String,
        user_role: String,
    },

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Upstream(ref e) => {
                tracing::error!("Upstream error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    sonic_rs::json!({ "error": "Internal server error" }),
                )
            }

            AppError::UpstreamParse(ref msg) => {
                tracing::error!("Upstream parse error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    sonic_rs::json!({
                        "success": false,
                        "message": "Server error: invalid upstream response",
                    }),
                )
            }

            AppError::Forbidden {
                ref required_role,
                ref user_role,
            } => {
                tracing::warn!(
                    "Authorization failed: requires {}, has {}",
                    required_role,
                    user_role
                );
                (
                    StatusCode::FORBIDDEN,
                    sonic_rs::json!({
                        "error": "Access denied. Insufficient permissions.",
                        "requiredRole": required_role.clone(),
                        "userRole": user_role.clone(),
                    }),
                )
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (
                    StatusCode::NOT_FOUND,
                    sonic_rs::json!({ "error": "Resource not found" }),
                )
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    sonic_rs::json!({ "success": false, "message": msg.clone() }),
                )
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    sonic_rs::json!({ "error": "Internal server error" }),
                )
            }
        };

        let body = sonic_rs::to_string(&body)
            .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, [(axum::http::header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
