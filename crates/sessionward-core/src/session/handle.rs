use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::state::{AuthStatus, SessionState};
use crate::auth::TokenStore;
use crate::error::AuthError;
use crate::models::User;

/// Identifies the session action that last started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Generation(u64);

struct Shared {
    tokens: TokenStore,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

/// The one session of this process: token store, state and generation
/// counter, shared by every consumer.
///
/// Clone is cheap and every clone sees the same session. No lock is held
/// across an await, so reads and writes are atomic relative to other local code.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn new(tokens: TokenStore) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            shared: Arc::new(Shared {
                tokens,
                state,
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.shared.tokens
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    pub fn status(&self) -> AuthStatus {
        self.shared.state.borrow().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.state.borrow().is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        self.shared.state.borrow().current_user().cloned()
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Apply a transition and notify subscribers
    pub(crate) fn update(&self, transition: impl FnOnce(&mut SessionState)) {
        self.shared.state.send_modify(transition);
    }

    /// Start a new action, superseding any still in flight
    pub(crate) fn begin(&self) -> Generation {
        Generation(self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub(crate) fn is_current(&self, generation: Generation) -> bool {
        self.shared.generation.load(Ordering::SeqCst) == generation.0
    }

    /// Persist a fresh access token and sign the user in, in one step.
    ///
    /// If the token cannot be persisted the session is cleared instead, so
    /// the store and the state never disagree.
    pub(crate) fn establish(&self, access_token: String, user: User) -> Result<(), AuthError> {
        if let Err(e) = self.tokens().save(&access_token, None) {
            warn!(error = %e, "Failed to persist access token");
            self.clear_local();
            return Err(e);
        }
        self.update(|state| {
            state.set_tokens(Some(access_token), None);
            state.set_user(Some(user));
        });
        Ok(())
    }

    /// Clear the token store and the state without touching the generation
    pub(crate) fn clear_local(&self) {
        if let Err(e) = self.tokens().clear() {
            warn!(error = %e, "Failed to clear token store");
        }
        self.update(SessionState::clear_auth);
    }

    /// End the session: supersede in-flight actions, clear tokens and state
    pub fn teardown(&self, reason: &str) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.clear_local();
        info!(reason, "Session torn down");
    }
}

/// Tears the session down when dropped, on every exit path.
pub(crate) struct TeardownGuard<'a> {
    session: &'a SessionHandle,
    reason: &'static str,
}

impl<'a> TeardownGuard<'a> {
    pub(crate) fn new(session: &'a SessionHandle, reason: &'static str) -> Self {
        Self { session, reason }
    }
}

impl Drop for TeardownGuard<'_> {
    fn drop(&mut self) {
        self.session.teardown(self.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenSlot;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: "u_1".to_string(),
            email: "a@x.com".to_string(),
            name: "A".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_establish_writes_store_and_state_together() {
        let session = SessionHandle::new(TokenStore::in_memory());
        session.establish("tok".to_string(), user()).expect("establish");

        assert_eq!(session.tokens().access_token().as_deref(), Some("tok"));
        assert_eq!(session.tokens().get(TokenSlot::RefreshToken), None);
        let state = session.snapshot();
        assert!(state.is_authenticated());
        assert_eq!(state.access_token(), Some("tok"));
    }

    #[test]
    fn test_teardown_clears_both_and_supersedes() {
        let session = SessionHandle::new(TokenStore::in_memory());
        session.establish("tok".to_string(), user()).expect("establish");
        let generation = session.begin();

        session.teardown("test");

        assert!(!session.is_current(generation));
        assert_eq!(session.tokens().access_token(), None);
        assert_eq!(session.status(), AuthStatus::Unauthenticated);
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn test_later_begin_supersedes_earlier() {
        let session = SessionHandle::new(TokenStore::in_memory());
        let first = session.begin();
        let second = session.begin();
        assert!(!session.is_current(first));
        assert!(session.is_current(second));
    }

    #[test]
    fn test_guard_tears_down_on_drop() {
        let session = SessionHandle::new(TokenStore::in_memory());
        session.establish("tok".to_string(), user()).expect("establish");
        {
            let _guard = TeardownGuard::new(&session, "test");
        }
        assert_eq!(session.tokens().access_token(), None);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let session = SessionHandle::new(TokenStore::in_memory());
        let mut rx = session.subscribe();
        assert!(!rx.has_changed().expect("sender alive"));

        session.establish("tok".to_string(), user()).expect("establish");

        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(rx.borrow_and_update().status(), AuthStatus::Authenticated);
    }
}
