//! Navigation targets and the guard's redirect decision.

use std::fmt;

use crate::state::auth::AuthStatus;

/// Console screens the session lifecycle can send the user to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    SignIn,
    Dashboard,
    CreateTenant,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::SignIn => "/authentication/sign-in",
            Self::Dashboard => "/dashboard",
            Self::CreateTenant => "/admin/create-tenant",
        }
    }

    /// Whether the screen requires an authenticated session.
    #[must_use]
    pub fn is_protected(self) -> bool {
        !matches!(self, Self::SignIn)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Where to navigate after the guard decided `status` for a view at `origin`.
///
/// - protected view + `Unauthenticated` → sign-in
/// - sign-in screen + `Authenticated` → dashboard
/// - anything else (including `Pending`) → stay
#[must_use]
pub fn redirect_for(status: AuthStatus, origin: Route) -> Option<Route> {
    match (status, origin.is_protected()) {
        (AuthStatus::Unauthenticated, true) => Some(Route::SignIn),
        (AuthStatus::Authenticated, false) => Some(Route::Dashboard),
        _ => None,
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
