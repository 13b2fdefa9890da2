use bytes::Bytes;
use reqwest::{Client, multipart};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::query::{email_search_query, where_literal};
use super::session::Session;
use crate::config::{BullhornConfig, CategoryPayload};
use crate::resume::CandidateName;
use crate::upstream::{self, Result};

const CATEGORY_SCAN_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct EntityResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    id: i64,
    #[serde(default)]
    name: Option<String>,
}

/// A resume ready to be attached to a candidate.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub bytes: Bytes,
    pub file_name: String,
    pub content_type: String,
    /// Correlation tag stored on the Bullhorn file, `hubspot-contact-<id>`
    pub external_id: String,
}

impl FileUpload {
    pub fn external_id_for_contact(contact_id: &str) -> String {
        format!("hubspot-contact-{contact_id}")
    }
}

/// Candidate, category and candidate-file calls against a [`Session`].
#[derive(Clone)]
pub struct BullhornClient {
    http: Client,
    file_type: String,
    category_payload: CategoryPayload,
}

impl BullhornClient {
    pub fn new(http: Client, config: &BullhornConfig) -> Self {
        Self {
            http,
            file_type: config.file_type.clone(),
            category_payload: config.category_payload,
        }
    }

    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    /// First candidate whose `email`, `email2` or `email3` is exactly `email`.
    #[instrument(skip(self, session), err)]
    pub async fn find_candidate_id_by_email(&self, session: &Session, email: &str) -> Result<Option<i64>> {
        session.ensure_valid()?;
        let email = email.trim();
        if email.is_empty() {
            return Ok(None);
        }

        let request = self.http.get(session.endpoint("search/Candidate")).query(&[
            ("BhRestToken", session.rest_token.as_str()),
            ("query", email_search_query(email).as_str()),
            ("fields", "id,email,email2,email3"),
            ("count", "1"),
        ]);
        let response = upstream::send(request, "Bullhorn candidate search").await?;
        let found: ListResponse<IdOnly> = upstream::json(response, "Bullhorn candidate search").await?;

        let id = found.data.first().map(|c| c.id).filter(|id| *id != 0);
        debug!(candidate_id = ?id, "Candidate search complete");
        Ok(id)
    }

    /// Category id by exact name. If Bullhorn rejects the filtered query (400), the first
    /// [`CATEGORY_SCAN_LIMIT`] categories are listed and matched case-insensitively instead.
    #[instrument(skip(self, session), err)]
    pub async fn find_category_id_by_name(&self, session: &Session, name: &str) -> Result<Option<i64>> {
        session.ensure_valid()?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let filter = format!("name={}", where_literal(name));
        match self.query_categories(session, &filter, 1).await {
            Ok(rows) => Ok(rows.first().map(|c| c.id).filter(|id| *id != 0)),
            Err(e) if e.status() == Some(400) => {
                warn!(category = name, error = %e, "Filtered category query rejected, scanning category list");
                let rows = self.query_categories(session, "id>0", CATEGORY_SCAN_LIMIT).await?;
                Ok(rows
                    .iter()
                    .find(|c| c.name.as_deref().is_some_and(|n| n.trim().eq_ignore_ascii_case(name)))
                    .map(|c| c.id))
            }
            Err(e) => Err(e),
        }
    }

    async fn query_categories(&self, session: &Session, filter: &str, count: u32) -> Result<Vec<CategoryRow>> {
        let count = count.to_string();
        let request = self.http.get(session.endpoint("query/Category")).query(&[
            ("BhRestToken", session.rest_token.as_str()),
            ("where", filter),
            ("fields", "id,name"),
            ("count", count.as_str()),
        ]);
        let response = upstream::send(request, "Bullhorn category query").await?;
        let rows: ListResponse<CategoryRow> = upstream::json(response, "Bullhorn category query").await?;
        Ok(rows.data)
    }

    /// Associate `category_id` with the candidate. Returns Bullhorn's response body.
    #[instrument(skip(self, session), err)]
    pub async fn update_candidate_category(
        &self,
        session: &Session,
        candidate_id: i64,
        category_id: i64,
    ) -> Result<Value> {
        session.ensure_valid()?;
        let payload = match self.category_payload {
            CategoryPayload::CategoryId => json!({ "categoryID": category_id }),
            CategoryPayload::CategoriesAdd => json!({ "categories": { "add": [category_id] } }),
        };

        let request = self
            .http
            .post(session.endpoint(&format!("entity/Candidate/{candidate_id}")))
            .query(&[("BhRestToken", session.rest_token.as_str())])
            .json(&payload);
        let response = upstream::send(request, "Bullhorn category update").await?;
        upstream::json(response, "Bullhorn category update").await
    }

    /// Multipart upload to the candidate's file attachments, tagged with the configured file type.
    #[instrument(skip(self, session, upload), fields(file_name = %upload.file_name, size = upload.bytes.len()), err)]
    pub async fn upload_candidate_file(&self, session: &Session, candidate_id: i64, upload: FileUpload) -> Result<Value> {
        session.ensure_valid()?;
        let FileUpload {
            bytes,
            file_name,
            content_type,
            external_id,
        } = upload;

        let part = match multipart::Part::bytes(bytes.to_vec())
            .file_name(file_name.clone())
            .mime_str(&content_type)
        {
            Ok(part) => part,
            Err(e) => {
                warn!(content_type = %content_type, error = %e, "Unusable content type, uploading without one");
                multipart::Part::bytes(bytes.to_vec()).file_name(file_name)
            }
        };
        // Bullhorn reads the plain `filename="..."` parameter, not the RFC 5987 form.
        let form = multipart::Form::new().percent_encode_noop().part("file", part);

        let request = self
            .http
            .put(session.endpoint(&format!("file/Candidate/{candidate_id}/raw")))
            .query(&[
                ("BhRestToken", session.rest_token.as_str()),
                ("filetype", self.file_type.as_str()),
                ("externalID", external_id.as_str()),
            ])
            .multipart(form);
        let response = upstream::send(request, "Bullhorn file upload").await?;
        upstream::json(response, "Bullhorn file upload").await
    }

    /// First and last name, used to name the uploaded file.
    #[instrument(skip(self, session), err)]
    pub async fn get_candidate_name(&self, session: &Session, candidate_id: i64) -> Result<CandidateName> {
        session.ensure_valid()?;
        let request = self
            .http
            .get(session.endpoint(&format!("entity/Candidate/{candidate_id}")))
            .query(&[
                ("BhRestToken", session.rest_token.as_str()),
                ("fields", "firstName,lastName"),
            ]);
        let response = upstream::send(request, "Bullhorn candidate fetch").await?;
        let entity: EntityResponse<CandidateName> = upstream::json(response, "Bullhorn candidate fetch").await?;
        Ok(entity.data)
    }
}
