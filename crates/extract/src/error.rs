use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error categories reported to callers of the completion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    NotConfigured,
    InvalidRequest,
    AuthError,
    RateLimit,
    ServerError,
    UnknownError,
    NetworkError,
    JsonParseError,
    MissingCandidates,
    UnexpectedStructure,
}

impl ApiErrorKind {
    pub const ALL: [ApiErrorKind; 10] = [
        ApiErrorKind::NotConfigured,
        ApiErrorKind::InvalidRequest,
        ApiErrorKind::AuthError,
        ApiErrorKind::RateLimit,
        ApiErrorKind::ServerError,
        ApiErrorKind::UnknownError,
        ApiErrorKind::NetworkError,
        ApiErrorKind::JsonParseError,
        ApiErrorKind::MissingCandidates,
        ApiErrorKind::UnexpectedStructure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApiErrorKind::NotConfigured => "not_configured",
            ApiErrorKind::InvalidRequest => "invalid_request",
            ApiErrorKind::AuthError => "auth_error",
            ApiErrorKind::RateLimit => "rate_limit",
            ApiErrorKind::ServerError => "server_error",
            ApiErrorKind::UnknownError => "unknown_error",
            ApiErrorKind::NetworkError => "network_error",
            ApiErrorKind::JsonParseError => "json_parse_error",
            ApiErrorKind::MissingCandidates => "missing_candidates",
            ApiErrorKind::UnexpectedStructure => "unexpected_structure",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Gemini API key not configured")]
    NotConfigured,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("authentication failed (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("rate limit exceeded: {message}")]
    RateLimit { message: String },

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("API request failed (status {status}): {message}")]
    Unknown { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("error parsing API response: {0}")]
    JsonParse(#[source] serde_json::Error),

    #[error("API response missing candidates")]
    MissingCandidates,

    #[error("unexpected API response structure")]
    UnexpectedStructure,
}

impl ApiError {
    /// Classify a non-success response. The provider's own message is used when the body
    /// has the `{"error": {"message": ...}}` form.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = provider_message(body)
            .unwrap_or_else(|| format!("API request failed with status code: {}", status.as_u16()));
        let status = status.as_u16();

        match status {
            401 | 403 => ApiError::Auth { status, message },
            429 => ApiError::RateLimit { message },
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Unknown { status, message },
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::NotConfigured => ApiErrorKind::NotConfigured,
            ApiError::InvalidRequest(_) => ApiErrorKind::InvalidRequest,
            ApiError::Auth { .. } => ApiErrorKind::AuthError,
            ApiError::RateLimit { .. } => ApiErrorKind::RateLimit,
            ApiError::Server { .. } => ApiErrorKind::ServerError,
            ApiError::Unknown { .. } => ApiErrorKind::UnknownError,
            ApiError::Network(_) => ApiErrorKind::NetworkError,
            ApiError::JsonParse(_) => ApiErrorKind::JsonParseError,
            ApiError::MissingCandidates => ApiErrorKind::MissingCandidates,
            ApiError::UnexpectedStructure => ApiErrorKind::UnexpectedStructure,
        }
    }

    /// Upstream failures that a different model may not share: 5xx and 404 (model not found).
    pub fn is_model_unavailable(&self) -> bool {
        matches!(
            self,
            ApiError::Server { .. } | ApiError::Unknown { status: 404, .. }
        )
    }

    /// Message suitable for showing to the person filling out the form.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotConfigured => "Gemini API key not configured.".to_string(),
            ApiError::InvalidRequest(reason) => reason.clone(),
            ApiError::Auth { .. } => {
                "Authentication failed. Your API key may be invalid. Please check your API key and try again.".to_string()
            }
            ApiError::RateLimit { .. } => {
                "API rate limit exceeded. Please wait a few minutes and try again.".to_string()
            }
            ApiError::Server { .. } => {
                "The API server encountered an error. Please try again later.".to_string()
            }
            ApiError::Network(_) => {
                "Could not reach the API server. Please check your connection and try again.".to_string()
            }
            _ => "Unknown API error occurred. Please try again.".to_string(),
        }
    }
}

fn provider_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let cases = [
            (401, ApiErrorKind::AuthError),
            (403, ApiErrorKind::AuthError),
            (429, ApiErrorKind::RateLimit),
            (500, ApiErrorKind::ServerError),
            (503, ApiErrorKind::ServerError),
            (400, ApiErrorKind::UnknownError),
            (404, ApiErrorKind::UnknownError),
        ];

        for (code, kind) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(ApiError::from_status(status, "").kind(), kind, "status {code}");
        }
    }

    #[test]
    fn test_provider_message_is_used() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        let err = ApiError::from_status(StatusCode::FORBIDDEN, body);
        assert!(err.to_string().contains("API key not valid."));

        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(err.to_string().contains("status code: 502"));
    }

    #[test]
    fn test_model_unavailable() {
        assert!(ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, "").is_model_unavailable());
        assert!(ApiError::from_status(StatusCode::NOT_FOUND, "").is_model_unavailable());
        assert!(!ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_model_unavailable());
        assert!(!ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "").is_model_unavailable());
    }

    #[test]
    fn test_kind_names() {
        for kind in ApiErrorKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }
}
