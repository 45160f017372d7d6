use crate::cache::CachedIdentity;
use crate::session::{Session, SessionStatus};

/// Navigation targets a guard can redirect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Proceed to the requested route.
    Allow,
    /// Send the user elsewhere.
    Redirect(Route),
    /// Session still resolving and no cached identity to bridge with:
    /// render a neutral placeholder, decide on the next session update.
    Pending,
}

/// Gate for protected routes.
///
/// The cached identity only matters while the live session is still
/// resolving — it bridges a full page reload so the user does not see a
/// login flash. It is a UX device, not a security boundary; the server
/// re-validates the bearer token on every request regardless.
pub fn require_auth(session: &Session, cached: &CachedIdentity) -> GuardDecision {
    match session.status {
        SessionStatus::Initializing => {
            if cached.user.is_some() {
                GuardDecision::Allow
            } else {
                GuardDecision::Pending
            }
        }
        SessionStatus::Authenticated => GuardDecision::Allow,
        SessionStatus::Anonymous => GuardDecision::Redirect(Route::Login),
    }
}

/// Gate for login/signup entry points — the inverse of [`require_auth`]:
/// an already-authenticated identity (live or cached) is sent to the
/// dashboard instead of the login form.
pub fn require_anonymous(session: &Session, cached: &CachedIdentity) -> GuardDecision {
    let bridging = session.status == SessionStatus::Initializing && cached.user.is_some();
    if session.is_authenticated() || bridging {
        return GuardDecision::Redirect(Route::Dashboard);
    }
    GuardDecision::Allow
}
