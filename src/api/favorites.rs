use reqwest::Method;

use crate::error::Error;
use crate::gateway::ApiClient;
use crate::models::{Case, Favorite, FavoriteRequest, FavoriteStatus, NewNote, Note, NoteUpdate};
use crate::types::{CaseId, NoteId};

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`Error::Request`] with status 400 if already favorited, 404 for
    /// an unknown case.
    pub async fn add_favorite(&self, case_id: CaseId) -> Result<Favorite, Error> {
        let builder = self
            .request(Method::POST, "/favorites/")?
            .json(&FavoriteRequest { case_id });
        self.send_json("add favorite", builder).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Request`] with status 404 if the case was not favorited.
    pub async fn remove_favorite(&self, case_id: CaseId) -> Result<(), Error> {
        let builder = self.request(Method::DELETE, &format!("/favorites/{case_id}"))?;
        self.send_empty("remove favorite", builder).await
    }

    /// # Errors
    ///
    /// Returns any gateway error.
    pub async fn favorites(&self) -> Result<Vec<Favorite>, Error> {
        let builder = self.request(Method::GET, "/favorites/")?;
        self.send_json("favorites list", builder).await
    }

    /// # Errors
    ///
    /// Returns any gateway error.
    pub async fn is_favorited(&self, case_id: CaseId) -> Result<bool, Error> {
        let builder = self.request(Method::GET, &format!("/favorites/check/{case_id}"))?;
        let status: FavoriteStatus = self.send_json("favorite check", builder).await?;
        Ok(status.is_favorited)
    }

    /// Flip the favorite flag given the state currently shown.
    ///
    /// Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns any gateway error; the flag is then unchanged.
    pub async fn toggle_favorite(&self, case_id: CaseId, favorited: bool) -> Result<bool, Error> {
        if favorited {
            self.remove_favorite(case_id).await?;
        } else {
            self.add_favorite(case_id).await?;
        }
        Ok(!favorited)
    }

    /// Favorites paired with their cases, in favorite order.
    ///
    /// Favorites whose case can no longer be fetched are skipped.
    ///
    /// # Errors
    ///
    /// Returns the error of the favorites listing, or [`Error::AuthExpired`]
    /// if the session ends midway.
    pub async fn favorite_cases(&self) -> Result<Vec<(Favorite, Case)>, Error> {
        let favorites = self.favorites().await?;
        let mut cases = Vec::with_capacity(favorites.len());
        for favorite in favorites {
            match self.case(favorite.case_id).await {
                Ok(case) => cases.push((favorite, case)),
                Err(Error::AuthExpired) => return Err(Error::AuthExpired),
                Err(e) => {
                    tracing::warn!(case_id = %favorite.case_id, error = %e, "Skipping favorite");
                }
            }
        }
        Ok(cases)
    }

    /// # Errors
    ///
    /// Returns [`Error::Validation`] for blank content, or any gateway error.
    pub async fn create_note(&self, case_id: CaseId, content: &str) -> Result<Note, Error> {
        let content = non_blank(content)?;
        let builder = self
            .request(Method::POST, "/favorites/notes")?
            .json(&NewNote { case_id, content });
        self.send_json("note creation", builder).await
    }

    /// # Errors
    ///
    /// Returns any gateway error.
    pub async fn notes(&self, case_id: CaseId) -> Result<Vec<Note>, Error> {
        let builder = self.request(Method::GET, &format!("/favorites/notes/{case_id}"))?;
        self.send_json("notes list", builder).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Validation`] for blank content, or [`Error::Request`]
    /// with status 404 for an unknown note.
    pub async fn update_note(&self, note_id: NoteId, content: &str) -> Result<Note, Error> {
        let content = non_blank(content)?;
        let builder = self
            .request(Method::PUT, &format!("/favorites/notes/{note_id}"))?
            .json(&NoteUpdate { content });
        self.send_json("note update", builder).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Request`] with status 404 for an unknown note.
    pub async fn delete_note(&self, note_id: NoteId) -> Result<(), Error> {
        let builder = self.request(Method::DELETE, &format!("/favorites/notes/{note_id}"))?;
        self.send_empty("note deletion", builder).await
    }
}

fn non_blank(content: &str) -> Result<&str, Error> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("note content must not be empty".into()));
    }
    Ok(trimmed)
}
