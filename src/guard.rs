use std::sync::Arc;

use crate::route::Route;
use crate::session::{SessionState, SessionStore};

/// Outcome of guarding a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<V> {
    /// Show the requested view unchanged.
    Render(V),
    /// Send the user elsewhere (the login entry point).
    Redirect(Route),
    /// The session is still being verified; show a loading state.
    Pending,
}

impl<V> Guarded<V> {
    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }

    pub fn map<W>(self, f: impl FnOnce(V) -> W) -> Guarded<W> {
        match self {
            Self::Render(v) => Guarded::Render(f(v)),
            Self::Redirect(r) => Guarded::Redirect(r),
            Self::Pending => Guarded::Pending,
        }
    }
}

/// Access check gating protected views behind an authenticated session.
///
/// A pure read of the current session state: no I/O, no waiting.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: Arc<SessionStore>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Decide whether `view` for `route` may be shown.
    pub fn check<V>(&self, route: Route, view: V) -> Guarded<V> {
        decide(&self.session.state(), route, view)
    }

    /// Guard a view that is protected by definition, without naming its route.
    ///
    /// Equivalent to [`check`](Self::check) with any protected route.
    pub fn protect<V>(&self, view: V) -> Guarded<V> {
        decide_protected(&self.session.state(), None, view)
    }
}

/// Guard decision for a given session state.
pub fn decide<V>(state: &SessionState, route: Route, view: V) -> Guarded<V> {
    if !route.is_protected() {
        return Guarded::Render(view);
    }
    decide_protected(state, Some(&route), view)
}

fn decide_protected<V>(state: &SessionState, route: Option<&Route>, view: V) -> Guarded<V> {
    match state {
        SessionState::LoggedIn { .. } => Guarded::Render(view),
        SessionState::Verifying { .. } => Guarded::Pending,
        SessionState::LoggedOut => {
            tracing::debug!(route = ?route, "Unauthenticated navigation redirected");
            Guarded::Redirect(Route::Login)
        }
    }
}
