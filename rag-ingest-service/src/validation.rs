//! Upload validation against configured type and size limits.

use std::path::Path;

use thiserror::Error;

use crate::config::UploadConfig;

/// What the validator knows about an incoming file
#[derive(Debug, Clone)]
pub struct FileDescriptor<'a> {
    pub file_name: &'a str,
    /// Declared `Content-Type` of the multipart field
    pub content_type: Option<&'a str>,
    pub size: u64,
}

/// Reason an upload was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("unsupported file type: {content_type}")]
    UnsupportedType { content_type: String },

    #[error("file too large: {size} bytes (max {max} bytes)")]
    SizeExceeded { size: u64, max: u64 },
}

/// Checks uploads against the allow-list and size ceiling
#[derive(Debug, Clone)]
pub struct FileValidator {
    allowed_types: Vec<String>,
    max_size: u64,
}

impl FileValidator {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            allowed_types: config
                .allowed_types
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .collect(),
            max_size: config.max_file_size_bytes,
        }
    }

    /// Validate an upload. The type is checked before the size.
    ///
    /// Returns the accepted content type, which is recorded on the asset and
    /// later selects the extractor.
    pub fn validate(&self, file: &FileDescriptor<'_>) -> Result<String, Rejection> {
        let content_type = effective_content_type(file);
        if !self.allowed_types.iter().any(|t| *t == content_type) {
            return Err(Rejection::UnsupportedType { content_type });
        }

        if file.size > self.max_size {
            return Err(Rejection::SizeExceeded {
                size: file.size,
                max: self.max_size,
            });
        }

        Ok(content_type)
    }
}

/// MIME essence used for the allow-list check.
///
/// Falls back to the file extension when the client sent no type or the
/// generic `application/octet-stream`.
pub fn effective_content_type(file: &FileDescriptor<'_>) -> String {
    let declared = file
        .content_type
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .map(|m| m.essence_str().to_ascii_lowercase())
        .filter(|essence| essence != mime::APPLICATION_OCTET_STREAM.essence_str());

    declared.unwrap_or_else(|| {
        content_type_for_extension(file.file_name)
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.essence_str())
            .to_string()
    })
}

fn content_type_for_extension(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())?;

    match extension.as_str() {
        "txt" | "text" => Some("text/plain"),
        "md" | "markdown" => Some("text/markdown"),
        "pdf" => Some("application/pdf"),
        "epub" => Some("application/epub+zip"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(max: u64) -> FileValidator {
        FileValidator::new(&UploadConfig {
            allowed_types: vec!["text/plain".to_string(), "application/pdf".to_string()],
            max_file_size_bytes: max,
        })
    }

    fn file<'a>(name: &'a str, content_type: Option<&'a str>, size: u64) -> FileDescriptor<'a> {
        FileDescriptor {
            file_name: name,
            content_type,
            size,
        }
    }

    #[test]
    fn test_accepts_allowed_type_within_limit() {
        let v = validator(100);
        assert_eq!(
            v.validate(&file("a.txt", Some("text/plain"), 100)),
            Ok("text/plain".to_string())
        );
        assert_eq!(
            v.validate(&file("a.txt", Some("text/plain; charset=utf-8"), 1)),
            Ok("text/plain".to_string())
        );
        assert_eq!(
            v.validate(&file("a.pdf", Some("Application/PDF"), 1)),
            Ok("application/pdf".to_string())
        );
        assert_eq!(
            v.validate(&file("README", Some("text/plain"), 1)),
            Ok("text/plain".to_string())
        );
    }

    #[test]
    fn test_rejects_oversized_file() {
        let v = validator(100);
        assert_eq!(
            v.validate(&file("a.txt", Some("text/plain"), 101)),
            Err(Rejection::SizeExceeded { size: 101, max: 100 })
        );
    }

    #[test]
    fn test_rejects_unsupported_type_before_size() {
        let v = validator(100);
        assert_eq!(
            v.validate(&file("a.png", Some("image/png"), 10_000)),
            Err(Rejection::UnsupportedType {
                content_type: "image/png".to_string()
            })
        );
    }

    #[test]
    fn test_falls_back_to_extension() {
        let v = validator(100);
        assert_eq!(
            v.validate(&file("report.PDF", None, 1)),
            Ok("application/pdf".to_string())
        );
        assert_eq!(
            v.validate(&file("notes.txt", Some("application/octet-stream"), 1)),
            Ok("text/plain".to_string())
        );
        assert!(matches!(
            v.validate(&file("archive.zip", None, 1)),
            Err(Rejection::UnsupportedType { .. })
        ));
        assert!(matches!(
            v.validate(&file("no_extension", None, 1)),
            Err(Rejection::UnsupportedType { .. })
        ));
    }
}
