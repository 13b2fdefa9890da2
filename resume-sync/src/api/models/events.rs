//! HubSpot webhook notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// HubSpot object id as it appeared in the payload: usually a number, occasionally a string.
/// Echoed back unchanged in result records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContactId {
    Number(serde_json::Number),
    Text(String),
}

impl ContactId {
    /// `None` for anything that cannot name a contact (missing, `0`, blank, non-scalar).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if n.as_u64() != Some(0) => Some(Self::Number(n.clone())),
            Value::String(s) if !s.trim().is_empty() => Some(Self::Text(s.trim().to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactId::Number(n) => write!(f, "{n}"),
            ContactId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ContactId {
    fn from(id: u64) -> Self {
        ContactId::Number(id.into())
    }
}

/// One item of a webhook delivery. Unknown members are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub object_id: Value,
}

impl WebhookEvent {
    /// Items that are not JSON objects, or whose members have the wrong shape, become an empty
    /// event that no subscription matches.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn contact_id(&self) -> Option<ContactId> {
        ContactId::from_value(&self.object_id)
    }
}

/// A delivery body: a JSON array of events or a single event object.
pub fn parse_events(body: &[u8]) -> Result<Vec<WebhookEvent>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let events = match serde_json::from_slice::<Value>(body)? {
        Value::Array(items) => items.into_iter().map(WebhookEvent::from_value).collect(),
        single => vec![WebhookEvent::from_value(single)],
    };
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_array_and_single_object() {
        let events = parse_events(
            br#"[{"subscriptionType":"object.propertyChange","objectId":42,"propertyName":"resume","portalId":1},
                 {"subscriptionType":"object.creation","objectId":"43"}]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].property_name.as_deref(), Some("resume"));
        assert_eq!(events[0].contact_id(), Some(ContactId::from(42)));
        assert_eq!(events[1].contact_id(), Some(ContactId::Text("43".to_string())));

        let events = parse_events(br#"{"subscriptionType":"object.propertyChange","objectId":7}"#).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].property_name, None);
    }

    #[test]
    fn test_empty_body_is_no_events() {
        assert!(parse_events(b"").unwrap().is_empty());
        assert!(parse_events(b"  \n").unwrap().is_empty());
        assert!(parse_events(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(parse_events(b"{not json").is_err());
    }

    #[test]
    fn test_odd_items_become_empty_events() {
        let events = parse_events(br#"[3, {"propertyName": 5}]"#).unwrap();
        assert_eq!(events, vec![WebhookEvent::default(), WebhookEvent::default()]);
    }

    #[test]
    fn test_contact_id_shapes() {
        assert_eq!(ContactId::from_value(&json!(0)), None);
        assert_eq!(ContactId::from_value(&json!("  ")), None);
        assert_eq!(ContactId::from_value(&json!(null)), None);
        assert_eq!(ContactId::from_value(&json!({"id": 1})), None);

        let id = ContactId::from_value(&json!(100133051)).unwrap();
        assert_eq!(id.to_string(), "100133051");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(100133051));

        let id = ContactId::from_value(&json!("abc-1")).unwrap();
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("abc-1"));
    }
}
