#![doc = include_str!("../README.md")]

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod models;
pub mod route;
pub mod session;
pub mod storage;
pub mod types;

// Re-exports for convenient access
pub use api::UploadedCase;
pub use config::ClientConfig;
pub use error::Error;
pub use gateway::ApiClient;
pub use guard::{Guarded, RouteGuard};
pub use models::{
    Analysis, AnalysisView, Case, ExportPerspective, Favorite, KeyElementsView, NewCase, NewUser,
    Note, Perspective, PlainKeyElements, SearchFilters, SearchRequest, SearchResponse,
    TokenResponse, User,
};
pub use route::{HistoryNavigator, Navigator, Route};
pub use session::{SessionState, SessionStore};
pub use storage::{CredentialStorage, FileStorage, MemoryStorage};
pub use types::{AccessToken, CaseId, FavoriteId, NoteId, UserId};
