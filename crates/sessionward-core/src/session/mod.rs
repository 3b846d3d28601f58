//! Client-side session lifecycle.
//!
//! This module provides:
//! - `SessionState`: the in-memory state machine (user, tokens, status, error)
//! - `SessionHandle`: the shared context owning the token store, the state and
//!   the generation counter that discards stale action results
//! - `SessionManager`: initialize, login, register, logout and the account
//!   recovery flows, driving the Auth API, token store and state together
//! - `ProtectedGate`: decides between pending, protected content and redirect

pub mod actions;
pub mod gate;
pub mod handle;
pub mod state;
pub mod validate;

pub use actions::SessionManager;
pub use gate::{GateView, ProtectedGate, DEFAULT_LOGIN_PATH};
pub use handle::SessionHandle;
pub use state::{AuthStatus, SessionError, SessionState};
