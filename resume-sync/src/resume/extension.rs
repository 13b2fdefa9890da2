//! File extension and content type resolution.
//!
//! The extension for an uploaded resume comes from, in priority order: the explicit file name,
//! the last path segment of the file URL, and finally the content type reported by the download.

use url::Url;

const MAX_EXTENSION_LEN: usize = 8;

/// Content types resumes commonly arrive as. Consulted before `mime_guess`, whose extension
/// lists are not ordered by preference (`application/msword` maps to `dot` as readily as `doc`).
const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    ("application/vnd.openxmlformats-officedocument.wordprocessingml.document", "docx"),
    ("application/rtf", "rtf"),
    ("text/rtf", "rtf"),
    ("text/plain", "txt"),
    ("application/vnd.oasis.opendocument.text", "odt"),
    ("text/html", "html"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionHints<'a> {
    pub file_name: Option<&'a str>,
    pub file_url: Option<&'a str>,
    pub content_type: Option<&'a str>,
}

/// Lower-cased extension without the leading dot.
pub fn resolve_resume_extension(hints: &ExtensionHints<'_>) -> Option<String> {
    hints
        .file_name
        .and_then(extension_from_name)
        .or_else(|| hints.file_url.and_then(extension_from_url))
        .or_else(|| hints.content_type.and_then(extension_for_content_type))
}

pub fn extension_from_name(name: &str) -> Option<String> {
    let last_segment = name.rsplit(['/', '\\']).next()?;
    let (stem, ext) = last_segment.trim().rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    valid_extension(ext)
}

pub fn extension_from_url(raw: &str) -> Option<String> {
    match Url::parse(raw) {
        Ok(url) => url.path_segments()?.next_back().and_then(extension_from_name),
        Err(_) => {
            let path = raw.split(['?', '#']).next()?;
            extension_from_name(path)
        }
    }
}

pub fn extension_for_content_type(content_type: &str) -> Option<String> {
    let essence = essence(content_type);
    if let Some((_, ext)) = CONTENT_TYPE_EXTENSIONS.iter().find(|(ct, _)| *ct == essence) {
        return Some((*ext).to_string());
    }

    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|exts| exts.first())
        .and_then(|ext| valid_extension(ext))
}

/// Content type to upload with: the reported one, unless it is missing or generic and the
/// file name suggests something better.
pub fn refine_content_type(reported: Option<&str>, file_name: Option<&str>) -> String {
    let reported = reported.map(str::trim).filter(|ct| !ct.is_empty());
    let generic = reported.is_none_or(|ct| essence(ct) == "application/octet-stream");

    if generic
        && let Some(guess) = file_name.and_then(|name| mime_guess::from_path(name).first_raw())
    {
        return guess.to_string();
    }

    reported.unwrap_or("application/octet-stream").to_string()
}

/// Signed URLs that have expired come back as an HTML login or error page.
pub fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

fn essence(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

fn valid_extension(ext: &str) -> Option<String> {
    let ext = ext.trim();
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
