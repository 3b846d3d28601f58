//! sessionward-core - client-side session lifecycle for token-based auth.
//!
//! Persists the access token, tracks who is signed in, attaches the bearer
//! credential to outbound calls and ends the session when the server says
//! the credential is no longer good.
//!
//! ```no_run
//! use sessionward_core::{Config, LoginRequest, SessionManager};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let manager = SessionManager::from_config(&config)?;
//! manager.initialize().await;
//! if !manager.session().is_authenticated() {
//!     manager.login(&LoginRequest::new("a@x.com", "pw123456")).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod session;

pub use api::{ApiClient, ApiError, AuthApi, ErrorCode};
pub use auth::{TokenSlot, TokenStore};
pub use config::{Config, StorageKind};
pub use error::{AuthError, ErrorKind};
pub use models::{LoginRequest, RegisterRequest, User};
pub use session::{
    AuthStatus, GateView, ProtectedGate, SessionError, SessionHandle, SessionManager, SessionState,
};
