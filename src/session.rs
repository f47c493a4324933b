//! Process-wide authentication state.
//!
//! [`SessionStore`] is the single source of truth for "who is logged in".
//! It owns the persisted credential: every read of the bearer token, the
//! gateway's included, goes through [`SessionStore::token`].
//!
//! ```rust,ignore
//! let session = Arc::new(SessionStore::open(FileStorage::new(path), "access_token"));
//! let mut changes = session.subscribe();
//! session.login(token, user)?;
//! assert!(changes.has_changed()?);
//! ```

use tokio::sync::watch;

use crate::error::Error;
use crate::models::User;
use crate::storage::CredentialStorage;
use crate::types::AccessToken;

/// Authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    /// A persisted token exists but has not been checked against the backend yet.
    Verifying { token: AccessToken },
    /// `user` is `None` until the identity fetch completes.
    LoggedIn {
        token: AccessToken,
        user: Option<User>,
    },
}

impl SessionState {
    #[must_use]
    pub fn token(&self) -> Option<&AccessToken> {
        match self {
            Self::LoggedOut => None,
            Self::Verifying { token } | Self::LoggedIn { token, .. } => Some(token),
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::LoggedIn { user, .. } => user.as_ref(),
            _ => None,
        }
    }

    /// True iff a token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    #[must_use]
    pub fn is_verifying(&self) -> bool {
        matches!(self, Self::Verifying { .. })
    }
}

/// Observable session container.
///
/// Mutated only through [`login`](Self::login), [`logout`](Self::logout) and
/// [`set_user`](Self::set_user), plus the 401 path [`expire_if`](Self::expire_if)
/// and the startup-verification outcomes.
pub struct SessionStore {
    storage: Box<dyn CredentialStorage>,
    key: String,
    state: watch::Sender<SessionState>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &self.key)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Initialize from persisted storage.
    ///
    /// A stored token yields `LoggedIn` with no user; nothing stored yields
    /// `LoggedOut`. Unreadable storage is treated as logged out.
    #[must_use]
    pub fn open(storage: impl CredentialStorage, key: impl Into<String>) -> Self {
        let key = key.into();
        let initial = match load_token(&storage, &key) {
            Some(token) => SessionState::LoggedIn { token, user: None },
            None => SessionState::LoggedOut,
        };
        Self::with_state(Box::new(storage), key, initial)
    }

    /// Like [`open`](Self::open), but a stored token starts in `Verifying`
    /// until [`confirm`](Self::confirm) or [`expire`](Self::expire) resolves it.
    #[must_use]
    pub fn open_verifying(storage: impl CredentialStorage, key: impl Into<String>) -> Self {
        let key = key.into();
        let initial = match load_token(&storage, &key) {
            Some(token) => SessionState::Verifying { token },
            None => SessionState::LoggedOut,
        };
        Self::with_state(Box::new(storage), key, initial)
    }

    fn with_state(
        storage: Box<dyn CredentialStorage>,
        key: String,
        initial: SessionState,
    ) -> Self {
        tracing::debug!(authenticated = initial.is_authenticated(), "Session initialized");
        let (state, _) = watch::channel(initial);
        Self { storage, key, state }
    }

    /// Record a successful authentication.
    ///
    /// The token is persisted before the in-memory state changes, so any
    /// request issued after this returns carries it. Overwrites an existing
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty token, or [`Error::Storage`]
    /// if the token cannot be persisted (the session is left unchanged).
    pub fn login(&self, token: impl Into<AccessToken>, user: User) -> Result<(), Error> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::Validation("access token must not be empty".into()));
        }
        self.storage.save(&self.key, token.as_str())?;
        tracing::info!(user_id = %user.id, username = %user.username, "Logged in");
        self.state.send_replace(SessionState::LoggedIn {
            token,
            user: Some(user),
        });
        Ok(())
    }

    /// Clear the session and erase the persisted credential. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the persisted entry cannot be erased.
    /// The in-memory session is cleared regardless.
    pub fn logout(&self) -> Result<(), Error> {
        let removed = self.storage.remove(&self.key);
        let previous = self.state.send_replace(SessionState::LoggedOut);
        if previous.is_authenticated() {
            tracing::info!("Logged out");
        }
        removed
    }

    /// Replace the identity without touching the token.
    ///
    /// Ignored unless logged in. A `Verifying` session is left as is too:
    /// only [`confirm`](Self::confirm) or [`accept_unverified`](Self::accept_unverified)
    /// resolve it.
    pub fn set_user(&self, user: User) {
        self.state.send_if_modified(|state| match state {
            SessionState::LoggedIn { user: current, .. } => {
                *current = Some(user);
                true
            }
            _ => {
                tracing::debug!("set_user ignored: not logged in");
                false
            }
        });
    }

    /// Resolve a `Verifying` session with the identity the backend returned
    /// for `token`.
    ///
    /// On an already logged-in session this is [`set_user`](Self::set_user).
    /// Ignored if the session has moved on to a different token meanwhile.
    pub fn confirm(&self, token: &AccessToken, user: User) {
        self.state.send_if_modified(|state| match state {
            SessionState::Verifying { token: current } if current == token => {
                *state = SessionState::LoggedIn {
                    token: token.clone(),
                    user: Some(user),
                };
                true
            }
            SessionState::LoggedIn {
                token: current,
                user: current_user,
            } if current == token => {
                *current_user = Some(user);
                true
            }
            _ => false,
        });
    }

    /// Verification could not reach a verdict (backend unreachable): keep the
    /// token and proceed as an unverified `LoggedIn` session.
    pub fn accept_unverified(&self, token: &AccessToken) {
        self.state.send_if_modified(|state| match state {
            SessionState::Verifying { token: current } if current == token => {
                *state = SessionState::LoggedIn {
                    token: token.clone(),
                    user: None,
                };
                true
            }
            _ => false,
        });
    }

    /// Drop the session everywhere, whatever token it holds.
    ///
    /// Storage failures are logged, not returned; the in-memory session is
    /// cleared either way.
    pub fn expire(&self) {
        tracing::warn!("Session expired; clearing credentials");
        if let Err(e) = self.logout() {
            tracing::warn!(error = %e, "Failed to erase persisted credential");
        }
    }

    /// The backend rejected `token`: expire the session if it still holds it.
    ///
    /// Returns `false`, leaving the session untouched, when a newer login has
    /// replaced `token` while the rejected request was in flight.
    pub fn expire_if(&self, token: &AccessToken) -> bool {
        let mut removed = Ok(());
        let expired = self.state.send_if_modified(|state| {
            if state.token() != Some(token) {
                return false;
            }
            removed = self.storage.remove(&self.key);
            *state = SessionState::LoggedOut;
            true
        });
        if expired {
            tracing::warn!("Session expired; credentials cleared");
            if let Err(e) = removed {
                tracing::warn!(error = %e, "Failed to erase persisted credential");
            }
        } else {
            tracing::debug!("Rejection for a superseded token; session kept");
        }
        expired
    }

    /// Current bearer token, the only credential accessor.
    #[must_use]
    pub fn token(&self) -> Option<AccessToken> {
        self.state.borrow().token().cloned()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch for state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

fn load_token(storage: &dyn CredentialStorage, key: &str) -> Option<AccessToken> {
    match storage.load(key) {
        Ok(token) => token.filter(|t| !t.is_empty()).map(AccessToken::new),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read persisted credential; starting logged out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{DEFAULT_TOKEN_KEY, MemoryStorage};
    use crate::types::UserId;

    fn user(name: &str) -> User {
        User::new(UserId(1), name, "a@x.com", "user")
    }

    /// Storage handle that stays inspectable after being moved into a store.
    #[derive(Clone, Default)]
    struct SharedStorage(Arc<MemoryStorage>);

    impl CredentialStorage for SharedStorage {
        fn load(&self, key: &str) -> Result<Option<String>, Error> {
            self.0.load(key)
        }
        fn save(&self, key: &str, value: &str) -> Result<(), Error> {
            self.0.save(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), Error> {
            self.0.remove(key)
        }
    }

    struct BrokenStorage;

    impl CredentialStorage for BrokenStorage {
        fn load(&self, _: &str) -> Result<Option<String>, Error> {
            Err(Error::Storage("unreadable".into()))
        }
        fn save(&self, _: &str, _: &str) -> Result<(), Error> {
            Err(Error::Storage("read-only".into()))
        }
        fn remove(&self, _: &str) -> Result<(), Error> {
            Err(Error::Storage("read-only".into()))
        }
    }

    #[test]
    fn initializes_from_persisted_token() {
        let storage = MemoryStorage::with_entry(DEFAULT_TOKEN_KEY, "abc123");
        let session = SessionStore::open(storage, DEFAULT_TOKEN_KEY);

        assert_eq!(session.token(), Some(AccessToken::new("abc123")));
        assert!(session.is_authenticated());
        assert_eq!(session.user(), None);
    }

    #[test]
    fn initializes_logged_out_when_nothing_persisted() {
        let session = SessionStore::open(MemoryStorage::new(), DEFAULT_TOKEN_KEY);
        assert_eq!(session.state(), SessionState::LoggedOut);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn unreadable_storage_starts_logged_out() {
        let session = SessionStore::open(BrokenStorage, DEFAULT_TOKEN_KEY);
        assert_eq!(session.state(), SessionState::LoggedOut);
    }

    #[test]
    fn login_sets_token_user_and_persists() {
        let storage = SharedStorage::default();
        let session = SessionStore::open(storage.clone(), DEFAULT_TOKEN_KEY);

        session.login("t", user("a")).unwrap();

        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some(AccessToken::new("t")));
        assert_eq!(session.user(), Some(user("a")));
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap().as_deref(), Some("t"));
    }

    #[test]
    fn login_overwrites_existing_session() {
        let session = SessionStore::open(MemoryStorage::new(), DEFAULT_TOKEN_KEY);
        session.login("first", user("a")).unwrap();
        session.login("second", user("b")).unwrap();

        assert_eq!(session.token(), Some(AccessToken::new("second")));
        assert_eq!(session.user().unwrap().username, "b");
    }

    #[test]
    fn login_rejects_empty_token() {
        let session = SessionStore::open(MemoryStorage::new(), DEFAULT_TOKEN_KEY);
        assert!(matches!(session.login("", user("a")), Err(Error::Validation(_))));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn failed_persist_leaves_session_unchanged() {
        let session = SessionStore::open(BrokenStorage, DEFAULT_TOKEN_KEY);
        assert!(matches!(session.login("t", user("a")), Err(Error::Storage(_))));
        assert_eq!(session.state(), SessionState::LoggedOut);
    }

    #[test]
    fn logout_clears_memory_and_storage() {
        let storage = SharedStorage::default();
        let session = SessionStore::open(storage.clone(), DEFAULT_TOKEN_KEY);
        session.login("t", user("a")).unwrap();

        session.logout().unwrap();

        assert_eq!(session.state(), SessionState::LoggedOut);
        assert_eq!(session.token(), None);
        assert_eq!(session.user(), None);
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn logout_is_idempotent() {
        let storage = SharedStorage::default();
        let session = SessionStore::open(storage.clone(), DEFAULT_TOKEN_KEY);
        session.login("t", user("a")).unwrap();

        session.logout().unwrap();
        let once = session.state();
        session.logout().unwrap();

        assert_eq!(session.state(), once);
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn logout_clears_memory_even_if_storage_fails() {
        let session = SessionStore::with_state(
            Box::new(BrokenStorage),
            DEFAULT_TOKEN_KEY.into(),
            SessionState::LoggedIn {
                token: AccessToken::new("t"),
                user: None,
            },
        );

        assert!(session.logout().is_err());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn set_user_keeps_token() {
        let session = SessionStore::open(MemoryStorage::new(), DEFAULT_TOKEN_KEY);
        session.login("tok", User::new(UserId(1), "a", "a@x.com", "user")).unwrap();

        session.set_user(User::new(UserId(1), "a2", "a@x.com", "user"));

        assert_eq!(session.token(), Some(AccessToken::new("tok")));
        assert_eq!(session.user().unwrap().username, "a2");
        assert!(session.is_authenticated());
    }

    #[test]
    fn set_user_fills_identity_after_restore() {
        let storage = MemoryStorage::with_entry(DEFAULT_TOKEN_KEY, "abc123");
        let session = SessionStore::open(storage, DEFAULT_TOKEN_KEY);

        session.set_user(user("a"));

        assert_eq!(session.user(), Some(user("a")));
    }

    #[test]
    fn set_user_ignored_when_logged_out() {
        let session = SessionStore::open(MemoryStorage::new(), DEFAULT_TOKEN_KEY);
        session.set_user(user("a"));
        assert_eq!(session.state(), SessionState::LoggedOut);
    }

    #[test]
    fn verifying_session_resolves_on_confirm() {
        let storage = MemoryStorage::with_entry(DEFAULT_TOKEN_KEY, "abc123");
        let session = SessionStore::open_verifying(storage, DEFAULT_TOKEN_KEY);
        assert!(session.state().is_verifying());
        // The token is held, so the invariant still reads authenticated.
        assert!(session.is_authenticated());

        session.confirm(&AccessToken::new("abc123"), user("a"));

        assert_eq!(
            session.state(),
            SessionState::LoggedIn {
                token: AccessToken::new("abc123"),
                user: Some(user("a")),
            }
        );
    }

    #[test]
    fn confirm_ignores_stale_token() {
        let storage = MemoryStorage::with_entry(DEFAULT_TOKEN_KEY, "old");
        let session = SessionStore::open_verifying(storage, DEFAULT_TOKEN_KEY);
        session.login("new", user("b")).unwrap();

        session.confirm(&AccessToken::new("old"), user("a"));

        assert_eq!(session.user().unwrap().username, "b");
    }

    #[test]
    fn unverified_session_keeps_token() {
        let storage = MemoryStorage::with_entry(DEFAULT_TOKEN_KEY, "abc123");
        let session = SessionStore::open_verifying(storage, DEFAULT_TOKEN_KEY);

        session.accept_unverified(&AccessToken::new("abc123"));

        assert_eq!(
            session.state(),
            SessionState::LoggedIn {
                token: AccessToken::new("abc123"),
                user: None,
            }
        );
    }

    #[test]
    fn verifying_session_resolves_on_expire() {
        let storage =
            SharedStorage(Arc::new(MemoryStorage::with_entry(DEFAULT_TOKEN_KEY, "old")));
        let session = SessionStore::open_verifying(storage.clone(), DEFAULT_TOKEN_KEY);

        session.expire();

        assert_eq!(session.state(), SessionState::LoggedOut);
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn expire_if_clears_matching_session() {
        let storage = SharedStorage::default();
        let session = SessionStore::open(storage.clone(), DEFAULT_TOKEN_KEY);
        session.login("t", user("a")).unwrap();

        assert!(session.expire_if(&AccessToken::new("t")));

        assert_eq!(session.state(), SessionState::LoggedOut);
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn expire_if_keeps_newer_session() {
        let storage =
            SharedStorage(Arc::new(MemoryStorage::with_entry(DEFAULT_TOKEN_KEY, "old")));
        let session = SessionStore::open(storage.clone(), DEFAULT_TOKEN_KEY);
        session.login("new", user("b")).unwrap();

        assert!(!session.expire_if(&AccessToken::new("old")));

        assert_eq!(session.token(), Some(AccessToken::new("new")));
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn expire_if_on_logged_out_session_is_a_no_op() {
        let session = SessionStore::open(MemoryStorage::new(), DEFAULT_TOKEN_KEY);
        let rx = session.subscribe();

        assert!(!session.expire_if(&AccessToken::new("t")));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn set_user_leaves_verifying_session_alone() {
        let storage = MemoryStorage::with_entry(DEFAULT_TOKEN_KEY, "abc123");
        let session = SessionStore::open_verifying(storage, DEFAULT_TOKEN_KEY);

        session.set_user(user("a"));

        assert!(session.state().is_verifying());
        assert_eq!(session.user(), None);
    }

    #[test]
    fn subscribers_observe_transitions() {
        let session = SessionStore::open(MemoryStorage::new(), DEFAULT_TOKEN_KEY);
        let mut rx = session.subscribe();
        assert!(!rx.has_changed().unwrap());

        session.login("t", user("a")).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());

        session.set_user(user("a"));
        assert_eq!(rx.borrow_and_update().user(), Some(&user("a")));

        session.logout().unwrap();
        assert!(!rx.borrow_and_update().is_authenticated());
    }

    #[test]
    fn debug_output_redacts_token() {
        let storage = MemoryStorage::with_entry(DEFAULT_TOKEN_KEY, "super-secret");
        let session = SessionStore::open(storage, DEFAULT_TOKEN_KEY);
        assert!(!format!("{session:?}").contains("super-secret"));
    }
}
