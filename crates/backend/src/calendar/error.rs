//! Classification of Google Calendar API failures.

use google_calendar3::hyper::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    /// Token missing, expired, or revoked. The user has to sign in with Google again.
    #[error("Unauthorized")]
    Unauthorized,

    /// Google rejected the request (4xx other than 401)
    #[error("{message}")]
    Client { status: u16, message: String },

    /// Google failed to serve the request (5xx)
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Google could not be reached or answered with something unreadable
    #[error("{0}")]
    Transport(String),

    /// The event could not be built from the submitted data
    #[error("{0}")]
    InvalidEvent(String),
}

impl CalendarError {
    pub fn invalid_event(message: impl Into<String>) -> Self {
        CalendarError::InvalidEvent(message.into())
    }

    /// Build from an HTTP status and the message Google attached to it.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => CalendarError::Unauthorized,
            400..=499 => CalendarError::Client { status, message },
            500..=599 => CalendarError::Server { status, message },
            // Not an error status, so Google answered with something we cannot use
            _ => CalendarError::Server {
                status: 502,
                message,
            },
        }
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            CalendarError::InvalidEvent(_) => {
                "Please pass necessary details for creating an event".to_string()
            }
            other => format!("Please try again. There seems to be a {} error.", other),
        }
    }

    /// Whether the event no longer exists on Google's side.
    pub fn is_gone(&self) -> bool {
        matches!(self, CalendarError::Client { status: 410, .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CalendarError::Unauthorized)
    }
}

/// Read `{"error": {"code": ..., "message": ...}}` from a Google error body.
fn from_error_body(body: &Value) -> CalendarError {
    let status = body
        .pointer("/error/code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(400);
    let message = body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or("Bad Request");

    CalendarError::from_status(status, message)
}

fn from_http_status(status: StatusCode) -> CalendarError {
    CalendarError::from_status(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown"),
    )
}

impl From<google_calendar3::Error> for CalendarError {
    fn from(err: google_calendar3::Error) -> Self {
        use google_calendar3::Error;

        match err {
            Error::BadRequest(body) => from_error_body(&body),
            Error::Failure(response) => from_http_status(response.status()),
            Error::MissingToken(e) => {
                tracing::warn!("Google token unavailable: {}", e);
                CalendarError::Unauthorized
            }
            Error::MissingAPIKey => CalendarError::Unauthorized,
            Error::HttpError(e) => CalendarError::Transport(format!("Connection failed: {}", e)),
            Error::Io(e) => CalendarError::Transport(format!("Connection failed: {}", e)),
            Error::JsonDecodeError(_, e) => {
                CalendarError::Transport(format!("Invalid response from Google: {}", e))
            }
            other => CalendarError::Client {
                status: 400,
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bad_request_body_is_classified_by_code() {
        let err: CalendarError = google_calendar3::Error::BadRequest(json!({
            "error": { "code": 404, "message": "Not Found" }
        }))
        .into();
        assert!(matches!(err, CalendarError::Client { status: 404, .. }));
        assert_eq!(err.to_string(), "Not Found");

        let err: CalendarError = google_calendar3::Error::BadRequest(json!({
            "error": { "code": 503, "message": "Backend Error" }
        }))
        .into();
        assert!(matches!(err, CalendarError::Server { status: 503, .. }));
    }

    #[test]
    fn test_401_body_is_unauthorized() {
        let err: CalendarError = google_calendar3::Error::BadRequest(json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        }))
        .into();
        assert!(err.is_unauthorized());
        assert_eq!(
            err.user_message(),
            "Please try again. There seems to be a Unauthorized error."
        );
    }

    #[test]
    fn test_missing_token_is_unauthorized() {
        let err: CalendarError = google_calendar3::Error::MissingToken("refresh failed".into()).into();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_io_failure_is_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
        let err: CalendarError = google_calendar3::Error::Io(io).into();
        assert!(matches!(err, CalendarError::Transport(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_failure_response_status() {
        assert!(from_http_status(StatusCode::UNAUTHORIZED).is_unauthorized());
        assert!(matches!(
            from_http_status(StatusCode::FORBIDDEN),
            CalendarError::Client { status: 403, .. }
        ));

        let err = from_http_status(StatusCode::SERVICE_UNAVAILABLE);
        assert!(matches!(err, CalendarError::Server { status: 503, .. }));
        assert_eq!(err.to_string(), "Service Unavailable");
    }

    #[test]
    fn test_non_error_status_is_server_error() {
        let err = CalendarError::from_status(200, "OK");
        assert!(matches!(err, CalendarError::Server { status: 502, .. }));

        let err: CalendarError = google_calendar3::Error::BadRequest(json!({
            "error": { "code": 302, "message": "Found" }
        }))
        .into();
        assert!(matches!(err, CalendarError::Server { status: 502, .. }));
    }

    #[test]
    fn test_malformed_body_defaults_to_bad_request() {
        let err: CalendarError = google_calendar3::Error::BadRequest(json!({"oops": true})).into();
        assert!(matches!(err, CalendarError::Client { status: 400, .. }));
        assert_eq!(err.to_string(), "Bad Request");
    }

    #[test]
    fn test_gone_detection() {
        assert!(CalendarError::from_status(410, "Resource has been deleted").is_gone());
        assert!(!CalendarError::from_status(404, "Not Found").is_gone());
    }

    #[test]
    fn test_invalid_event_message() {
        let err = CalendarError::invalid_event("title and description are both empty");
        assert_eq!(
            err.user_message(),
            "Please pass necessary details for creating an event"
        );
    }
}
