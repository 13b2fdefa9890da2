//! Helpers for turning a contact's stored resume value into an uploadable file.
//!
//! - [`value`]: parse the stored property into a [`FileReference`]
//! - [`extension`]: pick a file extension from name, URL or content type
//! - [`file_name`]: compose the name the file is uploaded under

pub mod extension;
pub mod file_name;
pub mod value;

pub use extension::{ExtensionHints, is_html, refine_content_type, resolve_resume_extension};
pub use file_name::{CandidateName, build_upload_file_name};
pub use value::{FileReference, parse_resume_value};
