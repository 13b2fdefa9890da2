use serde::Deserialize;

/// Name fields of a Bullhorn candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateName {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl CandidateName {
    pub fn full_name(&self) -> Option<String> {
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(sanitize)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}

/// Name the resume is uploaded under.
///
/// `Jane Doe Resume 4821.pdf` when the candidate's name is known, otherwise the source file name,
/// otherwise `resume-<contact id>`. The extension is appended unless the name already carries it.
pub fn build_upload_file_name(
    candidate: Option<&CandidateName>,
    candidate_id: i64,
    source_file_name: Option<&str>,
    contact_id: &str,
    extension: Option<&str>,
) -> String {
    if let Some(full_name) = candidate.and_then(CandidateName::full_name) {
        return with_extension(format!("{full_name} Resume {candidate_id}"), extension);
    }

    if let Some(source) = source_file_name.map(sanitize).filter(|name| !name.is_empty()) {
        return with_extension(source, extension);
    }

    with_extension(format!("resume-{contact_id}"), extension)
}

fn with_extension(stem: String, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !stem.to_ascii_lowercase().ends_with(&format!(".{}", ext.to_ascii_lowercase())) => {
            format!("{stem}.{ext}")
        }
        _ => stem,
    }
}

/// Drops path separators, characters Windows refuses in file names, and control characters,
/// then collapses runs of whitespace.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
