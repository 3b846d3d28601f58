use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Structured error code carried by an Auth API failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthenticated,
    Forbidden,
    InvalidCredentials,
    BadUserInput,
    Conflict,
    NotFound,
    RateLimited,
    Internal,
    Other(String),
}

impl ErrorCode {
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "UNAUTHENTICATED" => ErrorCode::Unauthenticated,
            "FORBIDDEN" => ErrorCode::Forbidden,
            "INVALID_CREDENTIALS" => ErrorCode::InvalidCredentials,
            "BAD_USER_INPUT" | "VALIDATION_ERROR" => ErrorCode::BadUserInput,
            "CONFLICT" => ErrorCode::Conflict,
            "NOT_FOUND" => ErrorCode::NotFound,
            "RATE_LIMITED" => ErrorCode::RateLimited,
            "INTERNAL_SERVER_ERROR" => ErrorCode::Internal,
            _ => ErrorCode::Other(code.to_string()),
        }
    }

    /// Derive a code from the HTTP status when the body carries none
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthenticated,
            403 => ErrorCode::Forbidden,
            400 | 422 => ErrorCode::BadUserInput,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            429 => ErrorCode::RateLimited,
            500..=599 => ErrorCode::Internal,
            other => ErrorCode::Other(format!("HTTP_{}", other)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::BadUserInput => "BAD_USER_INPUT",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Internal => "INTERNAL_SERVER_ERROR",
            ErrorCode::Other(code) => code,
        }
    }

    /// Codes that end the current session wherever they show up.
    pub fn is_session_terminating(&self) -> bool {
        matches!(self, ErrorCode::Unauthenticated | ErrorCode::Forbidden)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{code}: {message}")]
    Server { code: ErrorCode, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    errors: Option<Vec<GraphQlError>>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    extensions: Option<GraphQlExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphQlExtensions {
    code: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn server(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError::Server {
            code,
            message: message.into(),
        }
    }

    /// Build an error from a non-success response.
    /// A structured code in the body wins over the HTTP status.
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| Self::from_body(&value));

        parsed.unwrap_or_else(|| {
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                Self::truncate_body(body)
            };
            ApiError::Server {
                code: ErrorCode::from_status(status.as_u16()),
                message,
            }
        })
    }

    /// Look for a structured error in a JSON body.
    ///
    /// Accepts `{"error": {"code", "message"}}`, a flat `{"code", "message"}`,
    /// and GraphQL `{"errors": [{"message", "extensions": {"code"}}]}`. Among
    /// several GraphQL errors a session-terminating one is preferred.
    pub fn from_body(value: &Value) -> Option<Self> {
        let envelope: ErrorEnvelope = serde_json::from_value(value.clone()).ok()?;

        if let Some(body) = envelope.error {
            return Some(ApiError::Server {
                code: ErrorCode::parse(&body.code),
                message: body.message.unwrap_or_else(|| body.code.clone()),
            });
        }

        if let Some(errors) = envelope.errors {
            let mut found: Vec<ApiError> = errors
                .into_iter()
                .map(|e| {
                    let code = e
                        .extensions
                        .and_then(|ext| ext.code)
                        .map(|c| ErrorCode::parse(&c))
                        .unwrap_or(ErrorCode::Other("GRAPHQL_ERROR".to_string()));
                    ApiError::Server {
                        code,
                        message: e.message,
                    }
                })
                .collect();
            let terminating = found.iter().position(|e| e.is_session_terminating());
            return match terminating {
                Some(idx) => Some(found.swap_remove(idx)),
                None => found.into_iter().next(),
            };
        }

        envelope.code.map(|code| ApiError::Server {
            message: envelope.message.unwrap_or_else(|| code.clone()),
            code: ErrorCode::parse(&code),
        })
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            ApiError::Server { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_session_terminating(&self) -> bool {
        self.code().is_some_and(ErrorCode::is_session_terminating)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}
