use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};

/// Backend user identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Case identifier, as used in `/case/:id` and every case endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct CaseId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct NoteId(pub i64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct FavoriteId(pub i64);

/// Opaque bearer credential.
///
/// `Debug` is redacted so sessions can be logged without leaking the token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_id_parses_from_path_segment() {
        let id: CaseId = "42".parse().unwrap();
        assert_eq!(id, CaseId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<CaseId>().is_err());
    }

    #[test]
    fn ids_are_transparent_on_the_wire() {
        let json = serde_json::to_string(&NoteId(7)).unwrap();
        assert_eq!(json, "7");
        let parsed: UserId = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, UserId(3));
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("abc123");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
        assert_eq!(token.as_str(), "abc123");
    }

    #[test]
    fn newtypes_prevent_mixing() {
        fn takes_case_id(_: CaseId) {}
        fn takes_note_id(_: NoteId) {}

        takes_case_id(CaseId(1));
        takes_note_id(NoteId(1));
        // takes_case_id(NoteId(1));  // Compile error!
    }
}
