//! Unified error handling for the backend API.
//!
//! This module provides a centralized error type that implements `IntoResponse`,
//! allowing handlers to use `?` operator naturally while returning appropriate
//! HTTP status codes and error messages.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::clear_auth_cookie;
use crate::calendar::CalendarError;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// User store or other internal failure
    #[error("{0}")]
    Internal(#[from] anyhow::Error),

    /// Authentication required but not provided or invalid
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not permitted to access resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Google Calendar call failed
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }
}

fn calendar_error_response(err: &CalendarError) -> Response {
    let status = match err {
        CalendarError::Unauthorized => StatusCode::UNAUTHORIZED,
        CalendarError::Client { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
        }
        CalendarError::Server { .. } | CalendarError::Transport(_) => StatusCode::BAD_GATEWAY,
        CalendarError::InvalidEvent(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };

    if status.is_server_error() {
        tracing::error!("Google Calendar error: {:?}", err);
    } else {
        tracing::warn!("Google Calendar request rejected: {:?}", err);
    }

    let body = Json(ErrorResponse {
        error: err.user_message(),
        details: Some(err.to_string()),
    });

    // Google no longer accepts this user's credentials: sign them out so they log in again
    if err.is_unauthorized() {
        return (status, [(header::SET_COOKIE, clear_auth_cookie())], body).into_response();
    }

    (status, body).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(e.to_string()),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            ApiError::Calendar(err) => return calendar_error_response(err),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_status_mapping() {
        let cases = [
            (CalendarError::from_status(404, "Not Found"), StatusCode::NOT_FOUND),
            (CalendarError::from_status(403, "Forbidden"), StatusCode::FORBIDDEN),
            (CalendarError::from_status(500, "Backend Error"), StatusCode::BAD_GATEWAY),
            (CalendarError::Transport("timeout".into()), StatusCode::BAD_GATEWAY),
            (
                CalendarError::from(google_calendar3::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                ))),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CalendarError::invalid_event("empty"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
            assert!(response.headers().get(header::SET_COOKIE).is_none());
        }
    }

    #[test]
    fn test_unauthorized_calendar_error_clears_session() {
        let response = ApiError::from(CalendarError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }
}
