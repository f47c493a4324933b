//! Typed backend endpoints, all under `/api/v1`.
//!
//! Each group is an `impl ApiClient` block, so every call goes through the
//! gateway's interceptors.
//!
//! ```rust,ignore
//! use legalai_client::{ApiClient, ClientConfig, Route, SearchRequest};
//!
//! let config = ClientConfig::from_env()?;
//! let session = Arc::new(config.open_session());
//! let api = ApiClient::new(config, session, |route: &Route| router.go(route));
//!
//! api.sign_in("alice", "secret").await?;
//! let page = api.search(&SearchRequest::new("contract")).await?;
//! ```

mod auth;
mod cases;
mod favorites;

pub use cases::UploadedCase;
