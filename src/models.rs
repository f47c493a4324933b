//! Wire types exchanged with the backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use time::{Date, PrimitiveDateTime};

use crate::types::{AccessToken, CaseId, FavoriteId, NoteId, UserId};

// The backend emits naive UTC timestamps without an offset.
time::serde::format_description!(
    naive_datetime,
    PrimitiveDateTime,
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);
time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Authenticated user's identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub user_type: String,
    #[serde(default, with = "naive_datetime::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<PrimitiveDateTime>,
}

impl User {
    #[must_use]
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        user_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            user_type: user_type.into(),
            created_at: None,
        }
    }
}

/// Registration payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
}

impl NewUser {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            user_type: None,
        }
    }

    #[must_use]
    pub fn with_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }
}

/// Token response from `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: AccessToken,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Case {
    pub id: CaseId,
    pub case_number: String,
    pub title: String,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub judgment_date: Option<Date>,
    pub content: String,
    #[serde(default)]
    pub parties: Option<JsonValue>,
    #[serde(default)]
    pub legal_basis: Option<Vec<JsonValue>>,
    /// `"real"` for a reported judgment, `"example"` for teaching material.
    #[serde(default)]
    pub is_real: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, with = "naive_datetime::option")]
    pub created_at: Option<PrimitiveDateTime>,
}

impl Case {
    #[must_use]
    pub fn is_real(&self) -> bool {
        self.is_real.as_deref() == Some("real")
    }
}

/// Payload for `POST /cases/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCase {
    pub case_number: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "iso_date::option")]
    pub judgment_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parties: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_basis: Option<Vec<JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Search filters understood by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    pub page: u32,
    pub page_size: u32,
}

impl SearchRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;

    /// First page of results for `query`.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: None,
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Pages are 1-based; `0` is clamped to `1`.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[non_exhaustive]
pub struct SearchResponse {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<Case>,
}

impl SearchResponse {
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    #[must_use]
    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Which rendering of an analysis to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Perspective {
    Professional,
    #[default]
    Plain,
}

/// Which analysis variants to include in an exported PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPerspective {
    #[default]
    Both,
    Professional,
    Plain,
}

impl ExportPerspective {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Professional => "professional",
            Self::Plain => "plain",
        }
    }
}

/// Plain-language key elements of a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainKeyElements {
    #[serde(default)]
    pub who: Option<String>,
    #[serde(default)]
    pub what_happened: Option<String>,
    #[serde(default)]
    pub what_they_want: Option<String>,
}

/// AI-generated analysis with professional and plain-language variants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[non_exhaustive]
pub struct Analysis {
    pub case_id: CaseId,
    pub summary: String,
    #[serde(default)]
    pub summary_plain: Option<String>,
    #[serde(default)]
    pub key_elements: Map<String, JsonValue>,
    #[serde(default)]
    pub key_elements_plain: Option<PlainKeyElements>,
    pub legal_reasoning: String,
    #[serde(default)]
    pub legal_reasoning_plain: Option<String>,
    #[serde(default)]
    pub legal_basis: Vec<String>,
    #[serde(default)]
    pub legal_basis_plain: Option<Vec<String>>,
    pub judgment_result: String,
    #[serde(default)]
    pub judgment_result_plain: Option<String>,
    #[serde(default)]
    pub plain_language_tips: Option<String>,
}

/// Key elements as shown in one perspective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyElementsView<'a> {
    Professional(&'a Map<String, JsonValue>),
    Plain(&'a PlainKeyElements),
}

/// One perspective of an [`Analysis`], borrowed.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView<'a> {
    pub perspective: Perspective,
    pub summary: &'a str,
    pub key_elements: KeyElementsView<'a>,
    pub legal_reasoning: &'a str,
    pub legal_basis: &'a [String],
    pub judgment_result: &'a str,
    pub tips: Option<&'a str>,
}

impl Analysis {
    /// Select one perspective.
    ///
    /// Sections without a plain-language variant show the professional text.
    /// Tips only appear in the plain view.
    #[must_use]
    pub fn view(&self, perspective: Perspective) -> AnalysisView<'_> {
        match perspective {
            Perspective::Professional => AnalysisView {
                perspective,
                summary: &self.summary,
                key_elements: KeyElementsView::Professional(&self.key_elements),
                legal_reasoning: &self.legal_reasoning,
                legal_basis: &self.legal_basis,
                judgment_result: &self.judgment_result,
                tips: None,
            },
            Perspective::Plain => AnalysisView {
                perspective,
                summary: self.summary_plain.as_deref().unwrap_or(&self.summary),
                key_elements: self.key_elements_plain.as_ref().map_or(
                    KeyElementsView::Professional(&self.key_elements),
                    KeyElementsView::Plain,
                ),
                legal_reasoning: self
                    .legal_reasoning_plain
                    .as_deref()
                    .unwrap_or(&self.legal_reasoning),
                legal_basis: self
                    .legal_basis_plain
                    .as_deref()
                    .unwrap_or(&self.legal_basis),
                judgment_result: self
                    .judgment_result_plain
                    .as_deref()
                    .unwrap_or(&self.judgment_result),
                tips: self.plain_language_tips.as_deref(),
            },
        }
    }

    /// Whether the backend produced any plain-language text at all.
    #[must_use]
    pub fn has_plain_variant(&self) -> bool {
        self.summary_plain.is_some()
            || self.key_elements_plain.is_some()
            || self.legal_reasoning_plain.is_some()
            || self.legal_basis_plain.is_some()
            || self.judgment_result_plain.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct Favorite {
    pub id: FavoriteId,
    pub user_id: UserId,
    pub case_id: CaseId,
    #[serde(default, with = "naive_datetime::option")]
    pub created_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct Note {
    pub id: NoteId,
    pub user_id: UserId,
    pub case_id: CaseId,
    pub content: String,
    #[serde(default, with = "naive_datetime::option")]
    pub created_at: Option<PrimitiveDateTime>,
    #[serde(default, with = "naive_datetime::option")]
    pub updated_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewNote<'a> {
    pub(crate) case_id: CaseId,
    pub(crate) content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NoteUpdate<'a> {
    pub(crate) content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FavoriteRequest {
    pub(crate) case_id: CaseId,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FavoriteStatus {
    pub(crate) is_favorited: bool,
}
