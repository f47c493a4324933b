use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::Error;
use crate::gateway::ApiClient;
use crate::models::{Analysis, Case, ExportPerspective, NewCase, SearchRequest, SearchResponse};
use crate::types::CaseId;

/// Case created from an uploaded PDF.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct UploadedCase {
    pub id: CaseId,
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ApiClient {
    /// Keyword search, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthExpired`], [`Error::Request`] or [`Error::Http`].
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, Error> {
        let builder = self.request(Method::POST, "/cases/search")?.json(request);
        self.send_json("case search", builder).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Request`] with status 404 for an unknown case.
    pub async fn case(&self, id: CaseId) -> Result<Case, Error> {
        let builder = self.request(Method::GET, &format!("/cases/{id}"))?;
        self.send_json("case lookup", builder).await
    }

    /// Run (or fetch the stored) AI analysis of a case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] with status 404 for an unknown case or 500
    /// when the analysis backend fails.
    pub async fn analyze(&self, id: CaseId) -> Result<Analysis, Error> {
        let builder = self.request(Method::POST, &format!("/cases/{id}/analyze"))?;
        self.send_json("case analysis", builder).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Request`] with status 400 if the case number already exists.
    pub async fn create_case(&self, case: &NewCase) -> Result<Case, Error> {
        let builder = self.request(Method::POST, "/cases/")?.json(case);
        self.send_json("case creation", builder).await
    }

    /// Upload a judgment PDF as multipart field `file`.
    ///
    /// Only `.pdf` files below the configured size limit are sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] without contacting the backend if the file
    /// is not a PDF or is too large; otherwise any gateway error.
    pub async fn upload_pdf(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedCase, Error> {
        validate_upload(file_name, bytes.len() as u64, self.config().max_upload_bytes())?;

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let builder = self.request(Method::POST, "/cases/upload")?.multipart(form);
        let uploaded: UploadedCase = self.send_json("PDF upload", builder).await?;
        tracing::info!(case_id = %uploaded.id, file_name, "PDF uploaded");
        Ok(uploaded)
    }

    /// Render the analysis report as a PDF.
    ///
    /// # Errors
    ///
    /// Returns any gateway error.
    pub async fn export_pdf(
        &self,
        id: CaseId,
        perspective: ExportPerspective,
    ) -> Result<Vec<u8>, Error> {
        let builder = self
            .request(Method::POST, &format!("/cases/{id}/export-pdf"))?
            .query(&[("perspective", perspective.as_str())]);
        let response = self.send("PDF export", builder).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn validate_upload(file_name: &str, len: u64, max: u64) -> Result<(), Error> {
    let is_pdf = std::path::Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(Error::Validation(format!("{file_name}: only PDF files can be uploaded")));
    }
    if len == 0 {
        return Err(Error::Validation(format!("{file_name}: file is empty")));
    }
    if len >= max {
        return Err(Error::Validation(format!(
            "{file_name}: file must be smaller than {} MB",
            max / (1024 * 1024)
        )));
    }
    Ok(())
}
