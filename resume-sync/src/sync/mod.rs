//! Propagating HubSpot contact changes to Bullhorn candidates.
//!
//! [`dispatcher::EventDispatcher`] walks a webhook delivery one event at a time. Only
//! property-change events for the tracked contact properties (the resume property and the
//! category fields from [`SyncConfig`]) are acted on, along with property changes that do not name
//! a property; everything else is dropped without a record.

pub mod dispatcher;

pub use dispatcher::EventDispatcher;

use crate::api::models::events::WebhookEvent;
use crate::config::SyncConfig;
use crate::hubspot::Contact;

/// The subscription and contact properties a deployment reacts to.
#[derive(Debug, Clone)]
pub struct TrackedFields {
    subscription_type: String,
    resume_property: String,
    category_fields: Vec<String>,
}

impl TrackedFields {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            subscription_type: config.subscription_type.clone(),
            resume_property: config.resume_property.clone(),
            category_fields: config.category_fields.clone(),
        }
    }

    /// Property-change events for a tracked property, or for no property at all.
    pub fn accepts(&self, event: &WebhookEvent) -> bool {
        event.subscription_type.as_deref() == Some(self.subscription_type.as_str())
            && event.property_name.as_deref().is_none_or(|p| self.is_tracked(p))
    }

    pub fn is_tracked(&self, property: &str) -> bool {
        self.is_resume(property) || self.is_category(property)
    }

    pub fn is_resume(&self, property: &str) -> bool {
        property == self.resume_property
    }

    pub fn is_category(&self, property: &str) -> bool {
        self.category_fields.iter().any(|f| f == property)
    }

    pub fn resume_property(&self) -> &str {
        &self.resume_property
    }

    /// Properties requested when fetching a contact.
    pub fn contact_properties(&self) -> Vec<&str> {
        let mut properties = vec!["email", self.resume_property.as_str()];
        properties.extend(self.category_fields.iter().map(String::as_str));
        properties
    }

    /// First non-blank category field in declaration order, whichever field changed.
    pub fn selected_category<'c>(&self, contact: &'c Contact) -> Option<&'c str> {
        self.category_fields
            .iter()
            .find_map(|field| contact.property_str(field))
    }
}
