//! Persistent storage of credential material.
//!
//! This module provides:
//! - `TokenStore`: the three-slot store read by the credential injector and
//!   written by session actions, plus the unverified expiry check
//! - `TokenBackend`: the storage seam, with in-memory, file and OS keychain
//!   implementations

pub mod file;
pub mod keychain;
pub mod memory;
pub mod token_store;

pub use file::FileBackend;
pub use keychain::KeyringBackend;
pub use memory::MemoryBackend;
pub use token_store::{TokenBackend, TokenClaims, TokenSlot, TokenStore};
