use reqwest::Method;

use crate::error::Error;
use crate::gateway::ApiClient;
use crate::models::{NewUser, TokenResponse, User};
use crate::route::Route;
use crate::session::SessionState;

impl ApiClient {
    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if the backend refuses the registration
    /// (e.g. username taken), or [`Error::Http`] on network failure.
    pub async fn register(&self, user: &NewUser) -> Result<User, Error> {
        let builder = self
            .anonymous_request(Method::POST, "/auth/register")?
            .json(user);
        let response = self.send_anonymous("registration", builder).await?;
        response.json::<User>().await.map_err(Into::into)
    }

    /// Exchange credentials for a bearer token.
    ///
    /// Sent as a form (`application/x-www-form-urlencoded`). Wrong
    /// credentials come back as [`Error::Request`] with status 401; they do
    /// not expire the current session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] on rejection, or [`Error::Http`] on network failure.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, Error> {
        let params = [("username", username), ("password", password)];
        let builder = self
            .anonymous_request(Method::POST, "/auth/login")?
            .form(&params);
        let response = self.send_anonymous("login", builder).await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Fetch the identity of the current session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthExpired`] if the token is rejected.
    pub async fn me(&self) -> Result<User, Error> {
        let builder = self.request(Method::GET, "/auth/me")?;
        self.send_json("identity fetch", builder).await
    }

    /// Full login flow: token exchange, identity fetch, session update.
    ///
    /// The identity fetch carries the freshly issued token explicitly; the
    /// session only changes once both calls succeed.
    ///
    /// # Errors
    ///
    /// Returns any error of [`login`](Self::login) or the identity fetch, or
    /// [`Error::Storage`] if the token cannot be persisted.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<User, Error> {
        let token = self.login(username, password).await?.access_token;

        let builder = self.request_with_token(Method::GET, "/auth/me", &token)?;
        let user: User = self.send_json("identity fetch", builder).await?;

        self.session().login(token, user.clone())?;
        Ok(user)
    }

    /// Log out locally and go to the login view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the persisted credential cannot be
    /// erased; the in-memory session is cleared regardless.
    pub fn sign_out(&self) -> Result<(), Error> {
        let result = self.session().logout();
        self.navigate(&Route::Login);
        result
    }

    /// Resolve a restored session against the backend.
    ///
    /// A `Verifying` session (or a logged-in one still missing its user) is
    /// checked against `/auth/me` with exactly that token: success fills in
    /// the identity, a 401 expires it. If the backend cannot be reached the token is kept and
    /// the session proceeds unverified.
    ///
    /// Returns the identity when one is known afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthExpired`] when the token is rejected, or the
    /// failure that prevented verification.
    pub async fn verify_session(&self) -> Result<Option<User>, Error> {
        let (token, verifying) = match self.session().state() {
            SessionState::LoggedOut => return Ok(None),
            SessionState::LoggedIn {
                user: Some(user), ..
            } => return Ok(Some(user)),
            SessionState::LoggedIn { token, user: None } => (token, false),
            SessionState::Verifying { token } => (token, true),
        };

        let builder = self.request_with_token(Method::GET, "/auth/me", &token)?;
        match self.send_json::<User>("session verification", builder).await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "Restored session verified");
                self.session().confirm(&token, user.clone());
                Ok(Some(user))
            }
            Err(Error::AuthExpired) => Err(Error::AuthExpired),
            Err(e) => {
                if verifying {
                    tracing::warn!(error = %e, "Session verification failed; continuing unverified");
                    self.session().accept_unverified(&token);
                }
                Err(e)
            }
        }
    }
}
