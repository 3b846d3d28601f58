use std::sync::Arc;

use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::MemoryBackend;
use crate::error::AuthError;

/// The fixed named slots of the token store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSlot {
    AccessToken,
    /// Always empty today: refresh material lives in a server-managed cookie.
    RefreshToken,
    /// Reserved. Nothing writes it, but `clear()` still removes it.
    UserData,
}

impl TokenSlot {
    pub const ALL: [TokenSlot; 3] = [
        TokenSlot::AccessToken,
        TokenSlot::RefreshToken,
        TokenSlot::UserData,
    ];

    /// Storage key for this slot
    pub fn key(self) -> &'static str {
        match self {
            TokenSlot::AccessToken => "accessToken",
            TokenSlot::RefreshToken => "refreshToken",
            TokenSlot::UserData => "user",
        }
    }
}

/// Key-value storage behind a `TokenStore`.
pub trait TokenBackend: Send + Sync {
    fn read(&self, slot: TokenSlot) -> Result<Option<String>>;
    fn write(&self, slot: TokenSlot, value: &str) -> Result<()>;
    fn remove(&self, slot: TokenSlot) -> Result<()>;
}

/// Claims read from a token payload. Nothing here is verified.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub exp: f64,
    pub sub: Option<String>,
}

/// Persistent store for the current credential material.
/// Clone is cheap - the backend is shared.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn TokenBackend>,
}

impl TokenStore {
    pub fn new(backend: impl TokenBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    /// Overwrite the access and refresh slots.
    /// An absent refresh token removes the refresh slot.
    pub fn save(&self, access: &str, refresh: Option<&str>) -> Result<(), AuthError> {
        self.backend
            .write(TokenSlot::AccessToken, access)
            .map_err(storage_error)?;

        match refresh {
            Some(refresh) => self.backend.write(TokenSlot::RefreshToken, refresh),
            None => self.backend.remove(TokenSlot::RefreshToken),
        }
        .map_err(storage_error)?;

        debug!(has_refresh = refresh.is_some(), "Tokens saved");
        Ok(())
    }

    /// Read a slot. Unreadable and empty slots read as absent.
    pub fn get(&self, slot: TokenSlot) -> Option<String> {
        match self.backend.read(slot) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(slot = slot.key(), error = %e, "Failed to read token slot");
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.get(TokenSlot::AccessToken)
    }

    /// Remove all three slots, attempting every slot even if one fails
    pub fn clear(&self) -> Result<(), AuthError> {
        let mut first_error = None;
        for slot in TokenSlot::ALL {
            if let Err(e) = self.backend.remove(slot) {
                warn!(slot = slot.key(), error = %e, "Failed to clear token slot");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(storage_error(e)),
            None => {
                debug!("Tokens cleared");
                Ok(())
            }
        }
    }

    /// Decode the payload segment of a `header.payload.signature` token.
    pub fn decode_claims(token: &str) -> Result<TokenClaims, AuthError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(AuthError::Decode(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(segments[1].trim_end_matches('='))
            .map_err(|e| AuthError::Decode(format!("payload is not base64url: {}", e)))?;

        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|e| AuthError::Decode(format!("payload has no numeric exp: {}", e)))?;

        if !claims.exp.is_finite() {
            return Err(AuthError::Decode("exp is not a finite number".to_string()));
        }
        Ok(claims)
    }

    /// True when the expiry claim is in the past or cannot be read.
    ///
    /// The signature is not checked, so a `false` here grants no trust.
    pub fn is_expired(token: &str) -> bool {
        match Self::decode_claims(token) {
            Ok(claims) => (Utc::now().timestamp() as f64) >= claims.exp,
            Err(e) => {
                debug!(error = %e, "Treating unreadable token as expired");
                true
            }
        }
    }

    pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
        let claims = Self::decode_claims(token).ok()?;
        DateTime::from_timestamp(claims.exp as i64, 0)
    }
}

fn storage_error(e: anyhow::Error) -> AuthError {
    AuthError::Storage(format!("{:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an unsigned token whose payload is the given JSON
    fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.c2lnbmF0dXJl", header, body)
    }

    fn token_expiring_in(seconds: i64) -> String {
        token_with_payload(&serde_json::json!({
            "sub": "u_1",
            "exp": Utc::now().timestamp() + seconds,
        }))
    }

    #[test]
    fn test_save_then_get() {
        let store = TokenStore::in_memory();
        store.save("access-a", Some("refresh-r")).expect("save");

        assert_eq!(store.get(TokenSlot::AccessToken).as_deref(), Some("access-a"));
        assert_eq!(store.get(TokenSlot::RefreshToken).as_deref(), Some("refresh-r"));
        assert_eq!(store.get(TokenSlot::UserData), None);
    }

    #[test]
    fn test_save_without_refresh_removes_slot() {
        let store = TokenStore::in_memory();
        store.save("a1", Some("r1")).expect("save");
        store.save("a2", None).expect("save");

        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.get(TokenSlot::RefreshToken), None);
    }

    #[test]
    fn test_clear_removes_every_slot() {
        let backend = MemoryBackend::default();
        backend.write(TokenSlot::UserData, "{}").expect("write");
        let store = TokenStore::new(backend);
        store.save("a", Some("r")).expect("save");

        store.clear().expect("clear");

        for slot in TokenSlot::ALL {
            assert_eq!(store.get(slot), None, "slot {} survived clear", slot.key());
        }
    }

    #[test]
    fn test_empty_slot_reads_as_absent() {
        let store = TokenStore::in_memory();
        store.save("", None).expect("save");
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn test_is_expired_past_and_future() {
        assert!(TokenStore::is_expired(&token_expiring_in(-60)));
        assert!(!TokenStore::is_expired(&token_expiring_in(3600)));
    }

    #[test]
    fn test_is_expired_fails_closed() {
        assert!(TokenStore::is_expired(""));
        assert!(TokenStore::is_expired("opaque-token"));
        assert!(TokenStore::is_expired("a.b"));
        assert!(TokenStore::is_expired("a.!!!.c"));
        assert!(TokenStore::is_expired(&token_with_payload(&serde_json::json!({"sub": "u_1"}))));
        assert!(TokenStore::is_expired(&token_with_payload(&serde_json::json!({"exp": "tomorrow"}))));
    }

    #[test]
    fn test_expires_at() {
        let token = token_with_payload(&serde_json::json!({"exp": 1_900_000_000}));
        let expiry = TokenStore::expires_at(&token).expect("readable expiry");
        assert_eq!(expiry.timestamp(), 1_900_000_000);
        assert_eq!(TokenStore::expires_at("garbage"), None);
    }

    #[test]
    fn test_decode_claims_reads_subject() {
        let claims = TokenStore::decode_claims(&token_expiring_in(60)).expect("claims");
        assert_eq!(claims.sub.as_deref(), Some("u_1"));
    }
}
