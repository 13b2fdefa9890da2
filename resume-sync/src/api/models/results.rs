//! Per-event result records returned in the `{"results": [...]}` response body.

use serde::Serialize;
use serde_json::Value;

use super::events::{ContactId, WebhookEvent};
use crate::upstream::UpstreamError;

/// Body of a successful webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SyncResponse {
    /// `{"message": "No events to process"}`
    NoEvents { message: &'static str },
    /// `{"results": [...]}`
    Results { results: Vec<EventResult> },
}

impl SyncResponse {
    pub fn no_events() -> Self {
        SyncResponse::NoEvents {
            message: "No events to process",
        }
    }
}

/// What happened to one event. Absent members are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ContactId>,
    /// Set on top-level failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    /// Set on top-level failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_update: Option<FieldOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_upload: Option<FieldOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_upload_meta: Option<ResumeUploadMeta>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl EventResult {
    pub fn for_candidate(contact_id: ContactId, candidate_id: i64) -> Self {
        Self {
            contact_id: Some(contact_id),
            candidate_id: Some(candidate_id),
            ..Default::default()
        }
    }

    pub fn skipped(contact_id: Option<ContactId>, reason: impl Into<String>) -> Self {
        Self {
            contact_id,
            skipped: true,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// An event that failed outside any single field update.
    pub fn failed(event: &WebhookEvent, contact_id: Option<ContactId>, error: &UpstreamError) -> Self {
        Self {
            contact_id,
            subscription_type: event.subscription_type.clone(),
            property_name: event.property_name.clone(),
            error: Some(error.to_string()),
            status: error.status(),
            ..Default::default()
        }
    }
}

/// Outcome of one field update: Bullhorn's response body, or why nothing was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldOutcome {
    Skipped(SkippedField),
    Applied(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedField {
    pub skipped: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl FieldOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        FieldOutcome::Skipped(SkippedField {
            skipped: true,
            reason: reason.into(),
            error: None,
            status: None,
            content_type: None,
        })
    }

    pub fn failed(reason: impl Into<String>, error: &UpstreamError) -> Self {
        FieldOutcome::Skipped(SkippedField {
            skipped: true,
            reason: reason.into(),
            error: Some(error.to_string()),
            status: error.status(),
            content_type: None,
        })
    }

    pub fn skipped_content_type(reason: impl Into<String>, content_type: impl Into<String>) -> Self {
        FieldOutcome::Skipped(SkippedField {
            skipped: true,
            reason: reason.into(),
            error: None,
            status: None,
            content_type: Some(content_type.into()),
        })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            FieldOutcome::Skipped(skipped) => Some(&skipped.reason),
            FieldOutcome::Applied(_) => None,
        }
    }
}

/// What was sent with a resume upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeUploadMeta {
    pub candidate_id: i64,
    pub file_name: String,
    pub content_type: String,
    pub file_type: String,
    pub external_id: String,
}
