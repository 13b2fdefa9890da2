use serde::Serialize;
use serde_json::{Map, Value};

/// Where a resume lives, as far as the stored contact value tells us.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    pub file_id: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
}

impl FileReference {
    pub fn is_empty(&self) -> bool {
        self.file_id.is_none() && self.file_url.is_none()
    }
}

const ID_KEYS: &[&str] = &["id", "fileId"];
const URL_KEYS: &[&str] = &["url", "downloadUrl", "link"];
const NAME_KEYS: &[&str] = &["name", "fileName"];

/// Parse a stored property value.
///
/// Accepts a JSON object (`{"id": "55", "name": "r.pdf"}`), an absolute http(s) URL, or a bare
/// numeric file id. Anything else, including non-string values, resolves to nothing.
pub fn parse_resume_value(value: &Value) -> FileReference {
    match value {
        Value::String(raw) => parse_resume_str(raw),
        _ => FileReference::default(),
    }
}

pub fn parse_resume_str(raw: &str) -> FileReference {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FileReference::default();
    }

    if trimmed.starts_with('{')
        && let Ok(Value::Object(object)) = serde_json::from_str::<Value>(trimmed)
    {
        return FileReference {
            file_id: first_present(&object, ID_KEYS),
            file_url: first_present(&object, URL_KEYS),
            file_name: first_present(&object, NAME_KEYS),
        };
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return FileReference {
            file_url: Some(trimmed.to_string()),
            ..Default::default()
        };
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return FileReference {
            file_id: Some(trimmed.to_string()),
            ..Default::default()
        };
    }

    FileReference::default()
}

/// First alias holding a non-empty string or a non-zero number.
fn first_present(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}
