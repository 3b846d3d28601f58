//! Auth API access.
//!
//! This module provides:
//! - `AuthApi`: the remote operations the session layer consumes
//! - `ApiClient`: the HTTP implementation, also usable for any other
//!   authenticated call
//! - `CredentialInjector` / `FailureInterceptor`: the outbound and inbound
//!   middleware wired into every `ApiClient` request
//!
//! Requests carry `Authorization: Bearer <token>` exactly when the token
//! store holds an access token.

pub mod client;
pub mod error;
pub mod middleware;
pub mod operations;

pub use client::ApiClient;
pub use error::{ApiError, ErrorCode};
pub use middleware::{CallKind, CredentialInjector, FailureInterceptor};
pub use operations::AuthApi;
