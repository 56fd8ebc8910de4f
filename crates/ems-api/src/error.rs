//! API error type and its HTTP mapping
//!
//! Client-facing messages are fixed strings; the underlying cause is logged
//! and never written to the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ems_db::StoreError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Wrong password for an existing employee
    #[error("Invalid credentials")]
    Unauthorized,

    /// Missing, invalid or unresolvable token. The payload is the error code.
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    /// Storage or other server-side fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::BadRequest(message) => ErrorResponse {
                error: message,
                code: Some("BAD_REQUEST".to_string()),
            },
            ApiError::Unauthorized => ErrorResponse {
                error: "invalid credentials".to_string(),
                code: Some("INVALID_CREDENTIALS".to_string()),
            },
            ApiError::Forbidden(code) => ErrorResponse {
                error: "invalid token".to_string(),
                code: Some(code.to_string()),
            },
            ApiError::Internal(cause) => {
                error!(%cause, "Request failed");
                ErrorResponse {
                    error: "internal server error".to_string(),
                    code: Some("INTERNAL".to_string()),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbErr;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden("INVALID_TOKEN").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(StoreError::Database(DbErr::Custom("down".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_cause_not_leaked() {
        let response =
            ApiError::Internal("connection refused at 10.0.0.5:5432".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(error.error, "internal server error");
        assert!(!String::from_utf8_lossy(&body).contains("10.0.0.5"));
    }
}
