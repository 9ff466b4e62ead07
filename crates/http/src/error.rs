//! API error types

use gridlink_sheet::SheetError;
use serde::Deserialize;
use thiserror::Error;

/// Error body the API sends with 4xx/5xx responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiErrorBody {
    pub error_code: Option<i64>,
    pub message: Option<String>,
    pub ref_id: Option<String>,
}

/// Errors returned by the client
#[derive(Error, Debug)]
pub enum ApiError {
    /// 4xx response
    #[error("HTTP response code {status} - Error code {} - {message}", code(.error_code))]
    Client {
        status: u16,
        error_code: Option<i64>,
        message: String,
    },

    /// 5xx response
    #[error("HTTP response code {status} - Error code {} - {message}", code(.error_code))]
    Server {
        status: u16,
        error_code: Option<i64>,
        message: String,
    },

    #[error("{kind} object with the name '{name}' has not been found")]
    ObjectNotFound { kind: &'static str, name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The server answered but did not report `SUCCESS`
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

fn code(error_code: &Option<i64>) -> String {
    error_code.map_or_else(|| "unknown".to_string(), |code| code.to_string())
}

/// Result type for client operations
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Map a non-success response to a client or server error.
    ///
    /// The body is parsed as an API error object when possible and used
    /// verbatim as the message otherwise.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed.message.unwrap_or_else(|| body.trim().to_string());
        let error_code = parsed.error_code;
        if status >= 500 {
            ApiError::Server {
                status,
                error_code,
                message,
            }
        } else {
            ApiError::Client {
                status,
                error_code,
                message,
            }
        }
    }

    /// HTTP status of a client/server error
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Client { status, .. } | ApiError::Server { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the object does not exist, either remotely or by name
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::ObjectNotFound { .. }) || self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_parses_error_body() {
        let err = ApiError::from_response(
            404,
            r#"{"errorCode": 1006, "message": "Not Found", "refId": "abc"}"#,
        );
        assert!(matches!(
            &err,
            ApiError::Client { status: 404, error_code: Some(1006), message } if message == "Not Found"
        ));
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "HTTP response code 404 - Error code 1006 - Not Found"
        );
    }

    #[test]
    fn test_from_response_plain_body() {
        let err = ApiError::from_response(503, "upstream unavailable\n");
        assert!(matches!(
            &err,
            ApiError::Server { status: 503, error_code: None, message } if message == "upstream unavailable"
        ));
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_sheet_error_is_transparent() {
        let err = ApiError::from(SheetError::InvalidArgument("bad".into()));
        assert_eq!(err.to_string(), "Invalid argument: bad");
    }
}
