//! Session-level error taxonomy.
//!
//! `ApiError` describes what went wrong on the wire; `AuthError` is what a
//! session action reports to its caller and records in the session state.

use serde::Serialize;
use thiserror::Error;

use crate::api::{ApiError, CallKind, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Credential,
    Conflict,
    Authorization,
    Network,
    Decode,
    Storage,
    Unexpected,
    Superseded,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Credentials rejected: {0}")]
    Credential(String),

    #[error("Account conflict: {0}")]
    Conflict(String),

    #[error("Not authorized ({code}): {message}")]
    Authorization { code: ErrorCode, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed token: {0}")]
    Decode(String),

    #[error("Token storage failed: {0}")]
    Storage(String),

    #[error("Unexpected server response: {0}")]
    Unexpected(String),

    #[error("Superseded by a later session change")]
    Superseded,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::Credential(_) => ErrorKind::Credential,
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::Authorization { .. } => ErrorKind::Authorization,
            AuthError::Network(_) => ErrorKind::Network,
            AuthError::Decode(_) => ErrorKind::Decode,
            AuthError::Storage(_) => ErrorKind::Storage,
            AuthError::Unexpected(_) => ErrorKind::Unexpected,
            AuthError::Superseded => ErrorKind::Superseded,
        }
    }

    /// Classify an API failure for the kind of call that produced it.
    ///
    /// On a credential-exchange call an auth-class code is a verdict on the
    /// submitted credentials, not on the session.
    pub fn from_api(err: ApiError, call: CallKind) -> Self {
        match err {
            ApiError::Server { code, message } => match code {
                ErrorCode::Unauthenticated | ErrorCode::Forbidden => match call {
                    CallKind::CredentialExchange => AuthError::Credential(message),
                    CallKind::Session => AuthError::Authorization { code, message },
                },
                ErrorCode::InvalidCredentials => AuthError::Credential(message),
                ErrorCode::BadUserInput => AuthError::Validation(message),
                ErrorCode::Conflict => AuthError::Conflict(message),
                other => AuthError::Unexpected(format!("{}: {}", other, message)),
            },
            ApiError::Network(message) => AuthError::Network(message),
            ApiError::InvalidResponse(message) => AuthError::Unexpected(message),
        }
    }
}
