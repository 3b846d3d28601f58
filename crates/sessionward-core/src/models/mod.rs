//! Data models exchanged with the Auth API.
//!
//! - `User`: the profile of the signed-in account
//! - `LoginRequest`, `RegisterRequest`: credential-exchange request bodies
//! - `AuthPayload`: the `{user, accessToken}` result of login and register

pub mod user;

pub use user::{AuthPayload, LoginRequest, RegisterRequest, User};
