#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

/// Outcome of one session-guard evaluation.
///
/// `Pending` is the initial state while validate/refresh calls are in
/// flight; the other two are terminal for that evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    Pending,
    Authenticated,
    Unauthenticated,
}

impl AuthStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

/// Authentication state tracked by the rendering layer for one guarded view.
#[derive(Clone, Debug, Default)]
pub struct AuthState {
    pub status: AuthStatus,
    /// Roles decoded from the current access token, for display only.
    pub roles: Vec<String>,
}

impl AuthState {
    /// True while the guard has not produced a decision yet.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.status == AuthStatus::Pending
    }
}
