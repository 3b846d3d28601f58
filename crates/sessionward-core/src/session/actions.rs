//! Session actions: the only code that drives the Auth API, the token store
//! and the session state together.

use anyhow::Result;
use tracing::{debug, error, info, warn};

use super::handle::{SessionHandle, TeardownGuard};
use super::state::{AuthStatus, SessionError};
use super::validate;
use crate::api::{ApiClient, AuthApi, CallKind};
use crate::config::Config;
use crate::error::AuthError;
use crate::models::{LoginRequest, RegisterRequest, User};

pub struct SessionManager<A> {
    api: A,
    session: SessionHandle,
}

impl SessionManager<ApiClient> {
    /// Open the configured token store and bind an HTTP client to it
    pub fn from_config(config: &Config) -> Result<Self> {
        let session = SessionHandle::new(config.token_store()?);
        let api = ApiClient::new(config, &session)?;
        Ok(Self::new(api, session))
    }
}

impl<A: AuthApi> SessionManager<A> {
    pub fn new(api: A, session: SessionHandle) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Restore the session from the token store.
    ///
    /// Without a stored token no request is made. With one, the server is
    /// asked who it belongs to; any failure clears everything.
    pub async fn initialize(&self) -> Option<User> {
        let generation = self.session.begin();

        let Some(token) = self.session.tokens().access_token() else {
            debug!("No stored access token");
            self.session
                .update(|state| state.set_status(AuthStatus::Unauthenticated));
            return None;
        };

        self.session.update(|state| {
            state.set_tokens(Some(token), None);
            state.set_status(AuthStatus::Loading);
        });

        let result = self.api.fetch_current_user().await;
        if !self.session.is_current(generation) {
            debug!("Discarding stale session restore");
            return None;
        }

        match result {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored");
                self.session.update(|state| state.set_user(Some(user.clone())));
                Some(user)
            }
            Err(e) => {
                let err = AuthError::from_api(e, CallKind::Session);
                warn!(error = %err, "Stored session rejected, clearing");
                self.session.clear_local();
                None
            }
        }
    }

    /// Exchange email and password for a session.
    ///
    /// A rejected or failed attempt records the error but leaves any
    /// existing session's user and tokens in place.
    pub async fn login(&self, request: &LoginRequest) -> Result<User, AuthError> {
        validate::email(&request.email)?;
        validate::password_present(&request.password)?;

        let generation = self.session.begin();
        self.session.update(|state| state.set_status(AuthStatus::Loading));

        let result = self.api.login(request).await;
        if !self.session.is_current(generation) {
            debug!("Discarding stale login result");
            return Err(AuthError::Superseded);
        }

        match result {
            Ok(payload) => {
                let user = payload.user;
                if let Err(e) = self.session.establish(payload.access_token, user.clone()) {
                    self.record(&e);
                    return Err(e);
                }
                info!(user_id = %user.id, "Login successful");
                Ok(user)
            }
            Err(e) => {
                let err = AuthError::from_api(e, CallKind::CredentialExchange);
                error!(error = %err, "Login failed");
                self.record(&err);
                Err(err)
            }
        }
    }

    /// Create an account. The account still has to be verified, so the
    /// session ends up unauthenticated and the returned profile is only for
    /// confirmation.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AuthError> {
        validate::email(&request.email)?;
        validate::new_password(&request.password)?;
        validate::name(&request.name)?;

        let generation = self.session.begin();
        self.session.update(|state| state.set_status(AuthStatus::Loading));

        let result = self.api.register(request).await;
        if !self.session.is_current(generation) {
            debug!("Discarding stale register result");
            return Err(AuthError::Superseded);
        }

        match result {
            Ok(payload) => {
                debug!("Discarding access token issued at registration");
                self.session.clear_local();
                info!(user_id = %payload.user.id, "Registration successful, verification pending");
                Ok(payload.user)
            }
            Err(e) => {
                let err = AuthError::from_api(e, CallKind::CredentialExchange);
                error!(error = %err, "Registration failed");
                self.record(&err);
                Err(err)
            }
        }
    }

    /// End the session. The remote call is best effort; the local teardown
    /// happens on every exit path, including cancellation.
    pub async fn logout(&self) {
        self.session.begin();
        self.session.update(|state| state.set_status(AuthStatus::Loading));
        let _teardown = TeardownGuard::new(&self.session, "logout");

        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Remote logout failed, clearing local session anyway");
        }
    }

    /// Dismiss the pending error shown by a form
    pub fn clear_error(&self) {
        self.session.update(|state| state.clear_error());
    }

    // ===== Account recovery (no session changes) =====

    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        validate::email(email)?;
        self.api
            .forgot_password(email)
            .await
            .map_err(|e| AuthError::from_api(e, CallKind::CredentialExchange))
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate::token("Reset", token)?;
        validate::new_password(new_password)?;
        self.api
            .reset_password(token, new_password)
            .await
            .map_err(|e| AuthError::from_api(e, CallKind::CredentialExchange))
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        validate::token("Verification", token)?;
        self.api
            .verify_email(token)
            .await
            .map_err(|e| AuthError::from_api(e, CallKind::CredentialExchange))
    }

    pub async fn resend_verification_email(&self, email: &str) -> Result<(), AuthError> {
        validate::email(email)?;
        self.api
            .resend_verification_email(email)
            .await
            .map_err(|e| AuthError::from_api(e, CallKind::CredentialExchange))
    }

    fn record(&self, err: &AuthError) {
        let error = SessionError::from(err);
        self.session.update(|state| state.set_error(error));
    }
}
