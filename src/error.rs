#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The backend rejected the bearer token (HTTP 401).
    ///
    /// By the time a caller sees this the session has already been reset and
    /// the navigator sent to the login route. Callers should not redirect again.
    #[error("session expired, please log in again")]
    AuthExpired,

    /// Any non-401 HTTP failure, with the backend's `detail` message when it sent one.
    #[error("{operation} failed ({status}): {detail}")]
    Request {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected locally before any request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown route: {0}")]
    InvalidRoute(String),
}

impl Error {
    /// HTTP status carried by the error, if the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthExpired => Some(401),
            Self::Request { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Message suitable for showing at the call site.
    ///
    /// Prefers the backend's `detail` over the formatted error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Request { detail, .. } if !detail.is_empty() => detail.clone(),
            _ => self.to_string(),
        }
    }
}
