use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

use super::TrackedFields;
use crate::api::models::events::{ContactId, WebhookEvent};
use crate::api::models::results::{EventResult, FieldOutcome, ResumeUploadMeta};
use crate::bullhorn::{BullhornClient, FileUpload, Session, SessionManager};
use crate::config::Config;
use crate::hubspot::{Contact, HubSpotClient};
use crate::resume::{
    ExtensionHints, build_upload_file_name, is_html, parse_resume_value, refine_content_type, resolve_resume_extension,
};
use crate::upstream;

/// Runs webhook events through HubSpot and Bullhorn, strictly one after another.
#[derive(Clone)]
pub struct EventDispatcher {
    hubspot: HubSpotClient,
    sessions: SessionManager,
    bullhorn: BullhornClient,
    fields: TrackedFields,
}

impl EventDispatcher {
    pub fn new(hubspot: HubSpotClient, sessions: SessionManager, bullhorn: BullhornClient, fields: TrackedFields) -> Self {
        Self {
            hubspot,
            sessions,
            bullhorn,
            fields,
        }
    }

    /// `no_redirect` must be a client with redirects disabled.
    pub fn from_config(config: &Config, http: Client, no_redirect: Client, hubspot_token: &str) -> Self {
        Self::new(
            HubSpotClient::new(http.clone(), &config.hubspot, hubspot_token),
            SessionManager::new(http.clone(), no_redirect, config.bullhorn.clone()),
            BullhornClient::new(http, &config.bullhorn),
            TrackedFields::new(&config.sync),
        )
    }

    /// One record per acted-on event, in input order. Events outside the tracked subscription
    /// and properties produce no record. Failures are folded into the records; this never fails.
    pub async fn process_events(&self, events: &[WebhookEvent]) -> Vec<EventResult> {
        let mut results = Vec::new();

        for event in events {
            info!(
                subscription_type = ?event.subscription_type,
                property_name = ?event.property_name,
                object_id = %event.object_id,
                "Received webhook event"
            );

            if !self.fields.accepts(event) {
                debug!("Ignoring event outside the tracked subscription and properties");
                continue;
            }

            let Some(contact_id) = event.contact_id() else {
                results.push(EventResult::skipped(None, "Missing contact id"));
                continue;
            };

            match self.process_event(event, &contact_id).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(
                        contact_id = %contact_id,
                        property_name = ?event.property_name,
                        status = ?e.status(),
                        error = %e,
                        "Event processing failed"
                    );
                    results.push(EventResult::failed(event, Some(contact_id), &e));
                }
            }
        }

        results
    }

    #[instrument(skip(self, event), fields(contact_id = %contact_id, property = ?event.property_name))]
    async fn process_event(&self, event: &WebhookEvent, contact_id: &ContactId) -> upstream::Result<EventResult> {
        let property = event.property_name.as_deref().unwrap_or_default();
        let contact_key = contact_id.to_string();

        let contact = self
            .hubspot
            .get_contact(&contact_key, &self.fields.contact_properties())
            .await?;

        let Some(email) = contact.email() else {
            return Ok(EventResult::skipped(Some(contact_id.clone()), "Missing email"));
        };

        let session = self.sessions.acquire_session().await?;
        let Some(candidate_id) = self.bullhorn.find_candidate_id_by_email(&session, email).await? else {
            return Ok(EventResult::skipped(Some(contact_id.clone()), "Candidate not found"));
        };

        info!(candidate_id, "Processing contact");
        let mut result = EventResult::for_candidate(contact_id.clone(), candidate_id);

        if self.fields.is_category(property)
            && let Some(category_name) = self.fields.selected_category(&contact)
        {
            result.category_name = Some(category_name.to_string());
            let outcome = self
                .sync_category(&session, candidate_id, category_name, &mut result)
                .await;
            result.category_update = Some(outcome);
        }

        if self.fields.is_resume(property) {
            let outcome = self
                .sync_resume(&session, &contact, &contact_key, candidate_id, &mut result)
                .await;
            result.resume_upload = Some(outcome);
        }

        if result.category_update.is_none() && result.resume_upload.is_none() {
            result.skipped = true;
            result.reason = Some("No category or resume updates to apply".to_string());
        }

        Ok(result)
    }

    async fn sync_category(
        &self,
        session: &Session,
        candidate_id: i64,
        category_name: &str,
        result: &mut EventResult,
    ) -> FieldOutcome {
        let category_id = match self.bullhorn.find_category_id_by_name(session, category_name).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(candidate_id, category_name, "Category not found in Bullhorn");
                return FieldOutcome::skipped("Category not found");
            }
            Err(e) => {
                error!(candidate_id, category_name, status = ?e.status(), error = %e, "Bullhorn category lookup failed");
                return FieldOutcome::failed("Category update failed", &e);
            }
        };
        result.category_id = Some(category_id);

        match self
            .bullhorn
            .update_candidate_category(session, candidate_id, category_id)
            .await
        {
            Ok(body) => {
                info!(candidate_id, category_id, "Updated candidate category");
                FieldOutcome::Applied(body)
            }
            Err(e) => {
                error!(candidate_id, category_id, status = ?e.status(), error = %e, "Bullhorn category update failed");
                FieldOutcome::failed("Category update failed", &e)
            }
        }
    }

    async fn sync_resume(
        &self,
        session: &Session,
        contact: &Contact,
        contact_key: &str,
        candidate_id: i64,
        result: &mut EventResult,
    ) -> FieldOutcome {
        let raw = contact.property(self.fields.resume_property());
        if raw.is_null() || raw.as_str().is_some_and(|s| s.trim().is_empty()) {
            return FieldOutcome::skipped("Missing resume");
        }

        let reference = parse_resume_value(raw);
        let resolved = match self.hubspot.resolve_file(&reference).await {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                warn!(candidate_id, reference = ?reference, "Resume file not found");
                return FieldOutcome::skipped("Resume file not found");
            }
            Err(e) => return FieldOutcome::failed("Resume file lookup failed", &e),
        };
        info!(
            candidate_id,
            file_id = ?reference.file_id,
            file_name = ?resolved.file_name,
            "Resolved HubSpot file"
        );

        let downloaded = match self.hubspot.download(&resolved.url).await {
            Ok(file) => file,
            Err(e) => return FieldOutcome::failed("Resume download failed", &e),
        };

        if let Some(content_type) = downloaded.content_type.as_deref()
            && is_html(content_type)
        {
            warn!(candidate_id, file_id = ?reference.file_id, content_type, "HubSpot file fetch returned HTML");
            return FieldOutcome::skipped_content_type("HubSpot file fetch returned HTML", content_type);
        }

        let extension = resolve_resume_extension(&ExtensionHints {
            file_name: resolved.file_name.as_deref(),
            file_url: Some(&resolved.url),
            content_type: downloaded.content_type.as_deref(),
        });

        let candidate_name = match self.bullhorn.get_candidate_name(session, candidate_id).await {
            Ok(name) => Some(name),
            Err(e) => {
                warn!(candidate_id, error = %e, "Could not fetch candidate name, naming file from source");
                None
            }
        };

        let file_name = build_upload_file_name(
            candidate_name.as_ref(),
            candidate_id,
            resolved.file_name.as_deref(),
            contact_key,
            extension.as_deref(),
        );
        let content_type = refine_content_type(downloaded.content_type.as_deref(), Some(&file_name));

        let meta = ResumeUploadMeta {
            candidate_id,
            file_name: file_name.clone(),
            content_type: content_type.clone(),
            file_type: self.bullhorn.file_type().to_string(),
            external_id: FileUpload::external_id_for_contact(contact_key),
        };
        info!(candidate_id, file_name = %meta.file_name, content_type = %meta.content_type, "Uploading Bullhorn file");

        let upload = FileUpload {
            bytes: downloaded.bytes,
            file_name,
            content_type,
            external_id: meta.external_id.clone(),
        };

        match self.bullhorn.upload_candidate_file(session, candidate_id, upload).await {
            Ok(body) => {
                result.resume_upload_meta = Some(meta);
                FieldOutcome::Applied(body)
            }
            Err(e) => FieldOutcome::failed("Resume upload failed", &e),
        }
    }
}
