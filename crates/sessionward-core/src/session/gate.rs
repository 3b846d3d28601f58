use super::state::SessionState;

/// Default unauthenticated entry point
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// What a protected view should show for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateView {
    /// Status not settled yet. Neither content nor redirect.
    Pending,
    Protected,
    Redirect(String),
}

/// Guard in front of content that needs a signed-in user.
///
/// Idle counts as pending: before `initialize()` has run there must be no
/// flash of protected content and no premature redirect.
#[derive(Debug, Clone)]
pub struct ProtectedGate {
    login_path: String,
}

impl ProtectedGate {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn evaluate(&self, state: &SessionState) -> GateView {
        if !state.status().is_settled() {
            GateView::Pending
        } else if state.is_authenticated() {
            GateView::Protected
        } else {
            GateView::Redirect(self.login_path.clone())
        }
    }

    /// Render through whichever closure matches the current view
    pub fn render<T>(
        &self,
        state: &SessionState,
        pending: impl FnOnce() -> T,
        protected: impl FnOnce() -> T,
        redirect: impl FnOnce(&str) -> T,
    ) -> T {
        match self.evaluate(state) {
            GateView::Pending => pending(),
            GateView::Protected => protected(),
            GateView::Redirect(to) => redirect(&to),
        }
    }
}

impl Default for ProtectedGate {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH)
    }
}
