use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::route::{Navigator, Route};
use crate::session::SessionStore;
use crate::types::AccessToken;

/// Shared HTTP access point to the backend.
///
/// Every request passes through two interceptors:
/// - [`authorize`](Self::authorize) attaches `Authorization: Bearer <token>`
///   when the session holds a token, and nothing otherwise.
/// - [`intercept`](Self::intercept) turns a 401 into a session reset plus a
///   navigation to [`Route::Login`], and passes every other outcome through.
///
/// No retries, no timeouts beyond the transport defaults.
pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    #[must_use]
    pub fn new(
        config: ClientConfig,
        session: Arc<SessionStore>,
        navigator: impl Navigator,
    ) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            session,
            navigator: Arc::new(navigator),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub(crate) fn navigate(&self, route: &Route) {
        self.navigator.navigate(route);
    }

    /// Request interceptor: attach the current bearer token, if any.
    ///
    /// The token is read through the session store, never from storage
    /// directly, so each request carries a snapshot taken at dispatch time.
    #[must_use]
    pub fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    /// Response interceptor.
    ///
    /// `sent` is the bearer token the request carried. A 401 expires the
    /// session only while it still holds that token; a rejection of a token
    /// that a newer login already replaced leaves the session alone.
    ///
    /// # Errors
    ///
    /// - [`Error::AuthExpired`] on 401. The session has been expired and the
    ///   navigator sent to the login route, unless the session had moved on.
    /// - [`Error::Request`] for any other non-success status.
    /// - [`Error::Http`] for transport failures, unchanged.
    pub async fn intercept(
        &self,
        operation: &'static str,
        sent: Option<&AccessToken>,
        result: Result<Response, reqwest::Error>,
    ) -> Result<Response, Error> {
        let response = result?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(operation, url = %response.url(), "Backend rejected session");
            let current = match sent {
                Some(token) => self.session.expire_if(token),
                None => !self.session.is_authenticated(),
            };
            if current {
                self.navigate(&Route::Login);
            }
            return Err(Error::AuthExpired);
        }
        ensure_success(response, operation).await
    }

    /// Build an authorized request for an API path.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        let url = self.config.api_url(path)?;
        Ok(self.authorize(self.http.request(method, url)))
    }

    /// Build a request carrying an explicit token instead of the session's.
    pub(crate) fn request_with_token(
        &self,
        method: Method,
        path: &str,
        token: &AccessToken,
    ) -> Result<RequestBuilder, Error> {
        let url = self.config.api_url(path)?;
        Ok(self.http.request(method, url).bearer_auth(token.as_str()))
    }

    /// Build a request that carries no credential at all.
    pub(crate) fn anonymous_request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, Error> {
        let url = self.config.api_url(path)?;
        Ok(self.http.request(method, url))
    }

    /// Dispatch through both interceptors.
    pub(crate) async fn send(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<Response, Error> {
        tracing::debug!(operation, "Dispatching request");
        let (http, request) = builder.build_split();
        let request = request?;
        let sent = sent_token(&request);
        let result = http.execute(request).await;
        self.intercept(operation, sent.as_ref(), result).await
    }

    /// Dispatch a credential exchange.
    ///
    /// A 401 here means wrong credentials, not an expired session, so it is
    /// reported to the caller like any other failure.
    pub(crate) async fn send_anonymous(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<Response, Error> {
        tracing::debug!(operation, "Dispatching anonymous request");
        let response = builder.send().await?;
        ensure_success(response, operation).await
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, Error> {
        let response = self.send(operation, builder).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// Dispatch and discard the body (e.g. `204 No Content`).
    pub(crate) async fn send_empty(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<(), Error> {
        self.send(operation, builder).await.map(drop)
    }
}

/// The bearer token a built request carries, if any.
fn sent_token(request: &reqwest::Request) -> Option<AccessToken> {
    request
        .headers()
        .get(reqwest::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(AccessToken::from)
}

/// Checks HTTP response status; returns the response on success or an error with details.
async fn ensure_success(response: Response, operation: &'static str) -> Result<Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let detail = extract_detail(&body);
    tracing::debug!(operation, status, detail = %detail, "Request failed");
    Err(Error::Request {
        operation,
        status,
        detail,
    })
}

/// Pull the human-readable message out of an error body.
///
/// The backend answers `{"detail": "..."}`, or for validation failures
/// `{"detail": [{"msg": "..."}, ...]}`. Anything else is returned verbatim.
pub(crate) fn extract_detail(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<JsonValue>(body) else {
        return body.trim().to_string();
    };
    match json.get("detail") {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(JsonValue::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}
