use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::HubSpotClient;
use crate::resume::FileReference;
use crate::upstream::{self, Result};

/// File manager metadata for a stored file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl FileMetadata {
    /// HubSpot stores the name without its extension.
    pub fn display_name(&self) -> Option<String> {
        let name = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
        match self.extension.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(ext) if !name.to_ascii_lowercase().ends_with(&format!(".{}", ext.to_ascii_lowercase())) => {
                Some(format!("{name}.{ext}"))
            }
            _ => Some(name.to_string()),
        }
    }

    fn direct_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.download_url.as_deref().filter(|u| !u.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(default)]
    url: Option<String>,
}

/// A file we know how to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub url: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub bytes: Bytes,
    /// `Content-Type` as reported by the host, if any
    pub content_type: Option<String>,
}

impl HubSpotClient {
    #[instrument(skip(self), err)]
    pub async fn get_file(&self, file_id: &str) -> Result<FileMetadata> {
        let url = self.endpoint(&["files", "v3", "files", file_id]);
        let request = self.http.get(url).bearer_auth(&self.access_token);
        let response = upstream::send(request, "HubSpot file metadata fetch").await?;
        upstream::json(response, "HubSpot file metadata fetch").await
    }

    /// Short-lived signed download URL. `Ok(None)` when HubSpot answers without one.
    #[instrument(skip(self))]
    pub async fn get_signed_url(&self, file_id: &str) -> Result<Option<String>> {
        let url = self.endpoint(&["files", "v3", "files", file_id, "signed-url"]);
        let request = self.http.get(url).bearer_auth(&self.access_token);
        let response = upstream::send(request, "HubSpot signed URL fetch").await?;
        let signed: SignedUrlResponse = upstream::json(response, "HubSpot signed URL fetch").await?;
        Ok(signed.url.filter(|u| !u.is_empty()))
    }

    /// Turn a stored reference into a downloadable URL.
    ///
    /// A bare URL is returned as is. With a file id, the signed URL is preferred, then the
    /// metadata's own URLs, then whatever URL the reference carried. The signed URL lookup is
    /// best effort: its failure is logged and the next candidate is used. Metadata failures
    /// propagate. `Ok(None)` means there is nothing to download.
    #[instrument(skip(self), err)]
    pub async fn resolve_file(&self, reference: &FileReference) -> Result<Option<ResolvedFile>> {
        let Some(file_id) = reference.file_id.as_deref() else {
            return Ok(reference.file_url.clone().map(|url| ResolvedFile {
                url,
                file_name: reference.file_name.clone(),
            }));
        };

        let metadata = self.get_file(file_id).await?;

        let signed_url = match self.get_signed_url(file_id).await {
            Ok(url) => url,
            Err(e) => {
                warn!(file_id, status = ?e.status(), error = %e, "Failed to fetch HubSpot signed url, falling back to file metadata");
                None
            }
        };

        let url = signed_url
            .or_else(|| metadata.direct_url().map(str::to_string))
            .or_else(|| reference.file_url.clone());

        debug!(file_id, resolved = url.is_some(), "Resolved HubSpot file");

        Ok(url.map(|url| ResolvedFile {
            url,
            file_name: metadata.display_name().or_else(|| reference.file_name.clone()),
        }))
    }

    /// Fetch the file bytes. Signed URLs carry their own credentials, so no token is sent.
    #[instrument(skip(self), err)]
    pub async fn download(&self, url: &str) -> Result<DownloadedFile> {
        let response = upstream::send(self.http.get(url), "HubSpot file download").await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|source| upstream::UpstreamError::transport("HubSpot file download", source))?;

        Ok(DownloadedFile { bytes, content_type })
    }
}
