use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::TokenStore;
use crate::session::SessionHandle;

/// Whose credential a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Submits user-supplied secrets (login, register, recovery flows).
    /// An auth-class rejection judges those secrets, not the session.
    CredentialExchange,
    /// Relies on the session's access token.
    Session,
}

/// Attaches the stored access token to outbound requests.
///
/// Reads the token store directly so it works before the state is hydrated.
#[derive(Clone)]
pub struct CredentialInjector {
    tokens: TokenStore,
}

impl CredentialInjector {
    pub fn new(tokens: TokenStore) -> Self {
        Self { tokens }
    }

    /// Bearer header for the current token, or nothing at all
    pub fn authorization(&self) -> Option<HeaderValue> {
        let token = self.tokens.access_token()?;
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                Some(value)
            }
            Err(_) => {
                warn!("Stored access token is not a valid header value, sending without it");
                None
            }
        }
    }

    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self.authorization() {
            headers.insert(header::AUTHORIZATION, value);
        }
        headers
    }
}

/// Watches responses for auth-class errors and ends the session on them.
#[derive(Clone)]
pub struct FailureInterceptor {
    session: SessionHandle,
}

impl FailureInterceptor {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }

    /// Inspect a call's outcome and hand it back unchanged.
    ///
    /// A session-bearing call rejected with UNAUTHENTICATED or FORBIDDEN
    /// tears the session down, whatever endpoint it was. Transport failures
    /// are only logged.
    pub fn inspect<T>(&self, call: CallKind, url: &str, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ref err) = result {
            if err.is_transport() {
                warn!(url, error = %err, "Request failed before reaching the server");
            } else if err.is_session_terminating() {
                match call {
                    CallKind::Session => {
                        warn!(url, code = ?err.code(), "Server rejected session credential");
                        self.session.teardown("server rejected session credential");
                    }
                    CallKind::CredentialExchange => {
                        debug!(url, "Credential exchange rejected");
                    }
                }
            }
        }
        result
    }
}
