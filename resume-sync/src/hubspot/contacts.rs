use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::HubSpotClient;
use crate::upstream::{self, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl Contact {
    /// Raw property value; `Null` when absent.
    pub fn property(&self, name: &str) -> &Value {
        self.properties.get(name).unwrap_or(&Value::Null)
    }

    /// Trimmed string value, `None` when absent, not a string, or blank.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property(name).as_str().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.property_str("email")
    }
}

impl HubSpotClient {
    #[instrument(skip(self, properties), err)]
    pub async fn get_contact(&self, contact_id: &str, properties: &[&str]) -> Result<Contact> {
        let url = self.endpoint(&["crm", "v3", "objects", "contacts", contact_id]);
        debug!("Fetching HubSpot contact from {}", url);

        let request = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("properties", properties.join(","))]);

        let response = upstream::send(request, "HubSpot contact fetch").await?;
        upstream::json(response, "HubSpot contact fetch").await
    }
}
