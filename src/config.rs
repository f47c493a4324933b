use std::path::{Path, PathBuf};

use url::Url;

use crate::error::Error;
use crate::session::SessionStore;
use crate::storage::{DEFAULT_TOKEN_KEY, FileStorage};

const DEFAULT_API_URL: &str = "http://localhost:8000";
const API_PREFIX: &str = "/api/v1";

/// Uploads at or above this size are rejected before sending.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Client configuration.
///
/// Required field (`base_url`) is a constructor parameter; everything else has
/// a default and a `with_*` override.
///
/// Use [`from_env()`](ClientConfig::from_env) for convention-based setup,
/// or [`new()`](ClientConfig::new) with `with_*` methods for full control.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) credentials_path: PathBuf,
    pub(crate) token_key: String,
    pub(crate) verify_on_startup: bool,
    pub(crate) max_upload_bytes: u64,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            credentials_path: default_credentials_path(),
            token_key: DEFAULT_TOKEN_KEY.into(),
            verify_on_startup: false,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `LEGALAI_API_URL`: Backend base URL (default `http://localhost:8000`)
    /// - `LEGALAI_CREDENTIALS_PATH`: Credential file (default `$HOME/.legalai/credentials.json`)
    /// - `LEGALAI_TOKEN_KEY`: Key the token is stored under (default `access_token`)
    /// - `LEGALAI_VERIFY_SESSION`: Set to `"1"` or `"true"` to check a restored
    ///   token against the backend before treating it as logged in
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `LEGALAI_API_URL` is not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        let url_str =
            std::env::var("LEGALAI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let base_url: Url = url_str
            .parse()
            .map_err(|e| Error::Config(format!("LEGALAI_API_URL: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "LEGALAI_API_URL: unsupported scheme {}",
                base_url.scheme()
            )));
        }

        let mut config = Self::new(base_url);

        if let Ok(path) = std::env::var("LEGALAI_CREDENTIALS_PATH") {
            config = config.with_credentials_path(path);
        }
        if let Ok(key) = std::env::var("LEGALAI_TOKEN_KEY") {
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::Config("LEGALAI_TOKEN_KEY is set but empty".into()));
            }
            config = config.with_token_key(key);
        }

        let verify = matches!(
            std::env::var("LEGALAI_VERIFY_SESSION").as_deref(),
            Ok("1") | Ok("true"),
        );

        Ok(config.with_verify_on_startup(verify))
    }

    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    #[must_use]
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    #[must_use]
    pub fn with_verify_on_startup(mut self, verify: bool) -> Self {
        self.verify_on_startup = verify;
        self
    }

    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    #[must_use]
    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    #[must_use]
    pub fn verify_on_startup(&self) -> bool {
        self.verify_on_startup
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Open the session backed by the configured credential file.
    #[must_use]
    pub fn open_session(&self) -> SessionStore {
        let storage = FileStorage::new(&self.credentials_path);
        if self.verify_on_startup {
            SessionStore::open_verifying(storage, self.token_key.clone())
        } else {
            SessionStore::open(storage, self.token_key.clone())
        }
    }

    /// Absolute URL for an API path such as `/cases/search`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the result is not a valid URL.
    pub fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}{API_PREFIX}{path}")
            .parse()
            .map_err(|e| Error::Config(format!("{path}: {e}")))
    }
}

fn default_credentials_path() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(".legalai").join("credentials.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new("http://localhost:8000".parse().unwrap())
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.token_key(), "access_token");
        assert!(!config.verify_on_startup());
        assert_eq!(config.max_upload_bytes(), 10 * 1024 * 1024);
        assert!(config.credentials_path().ends_with(".legalai/credentials.json"));
    }

    #[test]
    fn api_url_joins_prefix() {
        let url = config().api_url("/cases/search").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/v1/cases/search");
    }

    #[test]
    fn api_url_keeps_base_path() {
        let config = ClientConfig::new("https://example.com/legal/".parse().unwrap());
        let url = config.api_url("/auth/me").unwrap();
        assert_eq!(url.as_str(), "https://example.com/legal/api/v1/auth/me");
    }

    #[test]
    fn overrides() {
        let config = config()
            .with_token_key("token")
            .with_credentials_path("/tmp/creds.json")
            .with_verify_on_startup(true);
        assert_eq!(config.token_key(), "token");
        assert_eq!(config.credentials_path(), Path::new("/tmp/creds.json"));
        assert!(config.verify_on_startup());
    }

    #[test]
    fn open_session_reads_credential_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"access_token":"abc123"}"#).unwrap();

        let session = config().with_credentials_path(&path).open_session();
        assert!(session.is_authenticated());
        assert!(!session.state().is_verifying());

        let verifying = config()
            .with_credentials_path(&path)
            .with_verify_on_startup(true)
            .open_session();
        assert!(verifying.state().is_verifying());
    }
}
