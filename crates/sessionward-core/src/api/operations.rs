use async_trait::async_trait;

use super::ApiError;
use crate::models::{AuthPayload, LoginRequest, RegisterRequest, User};

/// Remote operations of the Auth API.
///
/// Only the request and result shapes matter to the session layer; the
/// encoding belongs to the implementation.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload, ApiError>;

    async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;

    async fn fetch_current_user(&self) -> Result<User, ApiError>;

    async fn forgot_password(&self, email: &str) -> Result<(), ApiError>;

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError>;

    async fn verify_email(&self, token: &str) -> Result<(), ApiError>;

    async fn resend_verification_email(&self, email: &str) -> Result<(), ApiError>;
}
