//! Navigation targets of the client and the hook used to move between them.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use tokio::sync::watch;

use crate::error::Error;
use crate::types::CaseId;

/// A view the client can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Home,
    Upload,
    Favorites,
    CaseDetail(CaseId),
}

impl Route {
    /// Whether the view needs an authenticated session.
    #[must_use]
    pub fn is_protected(self) -> bool {
        !matches!(self, Self::Login)
    }

    #[must_use]
    pub fn path(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => f.write_str("/login"),
            Self::Home => f.write_str("/"),
            Self::Upload => f.write_str("/upload"),
            Self::Favorites => f.write_str("/favorites"),
            Self::CaseDetail(id) => write!(f, "/case/{id}"),
        }
    }
}

impl FromStr for Route {
    type Err = Error;

    /// Parses a path; query strings, fragments and a trailing slash are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Ok(Self::Home),
            "/login" => Ok(Self::Login),
            "/upload" => Ok(Self::Upload),
            "/favorites" => Ok(Self::Favorites),
            _ => trimmed
                .strip_prefix("/case/")
                .and_then(|id| id.parse::<CaseId>().ok())
                .map(Self::CaseDetail)
                .ok_or_else(|| Error::InvalidRoute(s.to_owned())),
        }
    }
}

/// Performs a full navigation.
///
/// Closures `Fn(&Route)` are navigators, so a UI shell can pass its own
/// router hook directly.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &Route);
}

impl<F> Navigator for F
where
    F: Fn(&Route) + Send + Sync + 'static,
{
    fn navigate(&self, route: &Route) {
        self(route);
    }
}

/// Navigator that keeps the visited routes and publishes the current one.
pub struct HistoryNavigator {
    current: watch::Sender<Route>,
    history: Mutex<Vec<Route>>,
}

impl HistoryNavigator {
    #[must_use]
    pub fn new(start: Route) -> Self {
        let (current, _) = watch::channel(start);
        Self {
            current,
            history: Mutex::new(vec![start]),
        }
    }

    #[must_use]
    pub fn current(&self) -> Route {
        *self.current.borrow()
    }

    #[must_use]
    pub fn history(&self) -> Vec<Route> {
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.current.subscribe()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, route: &Route) {
        tracing::debug!(path = %route, "Navigate");
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(*route);
        self.current.send_replace(*route);
    }
}
