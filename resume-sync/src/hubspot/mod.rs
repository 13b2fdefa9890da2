//! HubSpot: the source platform holding contacts and their stored resume files.
//!
//! - [`contacts`]: fetch the tracked properties of a contact
//! - [`files`]: resolve a stored file reference into a downloadable URL and fetch it

pub mod contacts;
pub mod files;

pub use contacts::Contact;
pub use files::{DownloadedFile, ResolvedFile};

use reqwest::Client;
use url::Url;

use crate::config::HubSpotConfig;

/// Client for the HubSpot CRM and file manager APIs, authenticated with a private app token.
#[derive(Clone)]
pub struct HubSpotClient {
    http: Client,
    base_url: Url,
    access_token: String,
}

impl HubSpotClient {
    pub fn new(http: Client, config: &HubSpotConfig, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: config.api_base_url.clone(),
            access_token: access_token.into(),
        }
    }

    /// Base URL with `segments` appended, each percent-encoded as a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
