use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::error::{AuthError, ErrorKind};
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
    Idle,
    Loading,
    Authenticated,
    Unauthenticated,
    Error,
}

impl AuthStatus {
    /// Idle and Loading are both "not known yet"
    pub fn is_settled(self) -> bool {
        !matches!(self, AuthStatus::Idle | AuthStatus::Loading)
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthStatus::Idle => "idle",
            AuthStatus::Loading => "loading",
            AuthStatus::Authenticated => "authenticated",
            AuthStatus::Unauthenticated => "unauthenticated",
            AuthStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Error recorded on the session until the next status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AuthError> for SessionError {
    fn from(err: &AuthError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// In-memory session record.
///
/// Transitions keep `status == Authenticated` exactly when a user is present
/// and no error is pending.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    user: Option<User>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    status: AuthStatus,
    error: Option<SessionError>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            access_token: None,
            refresh_token: None,
            status: AuthStatus::Idle,
            error: None,
        }
    }
}

impl SessionState {
    // ===== Transitions =====

    /// Set or clear the user, settling the status to match
    pub fn set_user(&mut self, user: Option<User>) {
        self.status = if user.is_some() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Unauthenticated
        };
        self.user = user;
        self.error = None;
    }

    pub fn set_tokens(&mut self, access: Option<String>, refresh: Option<String>) {
        self.access_token = access;
        self.refresh_token = refresh;
    }

    pub fn clear_auth(&mut self) {
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
        self.error = None;
        self.status = AuthStatus::Unauthenticated;
    }

    pub fn set_error(&mut self, error: SessionError) {
        self.error = Some(error);
        self.status = AuthStatus::Error;
    }

    /// Change status. Any status other than Error drops the pending error.
    pub fn set_status(&mut self, status: AuthStatus) {
        if status == AuthStatus::Authenticated && self.user.is_none() {
            warn!("Refusing authenticated status without a user");
            self.status = AuthStatus::Unauthenticated;
        } else {
            self.status = status;
        }
        if self.status != AuthStatus::Error {
            self.error = None;
        }
    }

    /// Dismiss a pending error and settle from whether a user is present
    pub fn clear_error(&mut self) {
        if self.status == AuthStatus::Error || self.error.is_some() {
            let user = self.user.take();
            self.set_user(user);
        }
    }

    // ===== Projections =====

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated && self.user.is_some() && self.error.is_none()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}
