//! Content extraction from stored uploads.
//!
//! Each supported format produces a list of [`Section`]s: the whole file for
//! plain text, heading-delimited sections for Markdown, one section per page
//! for PDF and one per spine item for EPUB. Section text is normalized (BOM
//! stripped, line endings converted to `\n`) before chunking.

mod epub;
mod pdf;
mod text;

use std::path::Path;

use tracing::{debug, error, warn};

use crate::db::Asset;
use crate::error::{ProcessingError, ServiceError, ServiceResult, format_error_chain};
use crate::naming::FileNamer;

/// Contiguous piece of a document with its location, if the format has one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: Option<String>,
    pub content: String,
    /// 1-based page (PDF) or chapter (EPUB) number
    pub page_number: Option<u32>,
}

/// Text extracted from one file
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub sections: Vec<Section>,
}

impl ExtractedContent {
    pub fn total_chars(&self) -> usize {
        self.sections.iter().map(|s| s.content.chars().count()).sum()
    }
}

/// Formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Pdf,
    Epub,
}

impl DocumentFormat {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "text/plain" => Some(DocumentFormat::PlainText),
            "text/markdown" | "text/x-markdown" => Some(DocumentFormat::Markdown),
            "application/pdf" => Some(DocumentFormat::Pdf),
            "application/epub+zip" => Some(DocumentFormat::Epub),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;

        match extension.as_str() {
            "txt" | "text" => Some(DocumentFormat::PlainText),
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            "pdf" => Some(DocumentFormat::Pdf),
            "epub" => Some(DocumentFormat::Epub),
            _ => None,
        }
    }

    /// The recorded content type wins; the extension is the fallback for
    /// types with no parser of their own.
    pub fn detect(content_type: Option<&str>, path: &Path) -> Option<Self> {
        content_type
            .and_then(Self::from_content_type)
            .or_else(|| Self::from_path(path))
    }
}

/// Reads stored files and turns them into normalized text sections
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    namer: FileNamer,
}

impl ContentExtractor {
    pub fn new(namer: FileNamer) -> Self {
        Self { namer }
    }

    /// Extract the content of a stored asset.
    ///
    /// Returns `None` when the file is missing, its format is unsupported, or
    /// parsing fails; the cause is logged here so callers can skip the file.
    pub async fn extract(&self, asset: &Asset) -> Option<ExtractedContent> {
        let project_key = asset.project_id.as_str();
        let asset_name = asset.name.as_str();
        let path = self.namer.file_path(project_key, asset_name);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                warn!(project_key, asset_name, path = %path.display(), "Stored path is not a file");
                return None;
            }
            Err(e) => {
                warn!(project_key, asset_name, path = %path.display(), error = %e, "Stored file not found");
                return None;
            }
        }

        // PDF and EPUB parsing is blocking; keep it off the async workers.
        let result = tokio::task::spawn_blocking({
            let path = path.clone();
            let content_type = asset.content_type.clone();
            move || extract_file(&path, content_type.as_deref())
        })
        .await
        .map_err(|e| ServiceError::Internal {
            message: format!("Extraction task failed: {}", e),
        })
        .and_then(|r| r);

        match result {
            Ok(content) => {
                debug!(
                    project_key,
                    asset_name,
                    sections = content.sections.len(),
                    chars = content.total_chars(),
                    "Content extracted"
                );
                Some(content)
            }
            Err(e) => {
                error!(
                    project_key,
                    asset_name,
                    error = %format_error_chain(&e),
                    "Content extraction failed"
                );
                None
            }
        }
    }
}

/// Extract and normalize a file according to its content type or extension
pub fn extract_file(path: &Path, content_type: Option<&str>) -> ServiceResult<ExtractedContent> {
    let format = DocumentFormat::detect(content_type, path).ok_or_else(|| {
        ProcessingError::UnsupportedFormat {
            format: content_type.map(str::to_string).unwrap_or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default()
                    .to_string()
            }),
        }
    })?;

    let sections = match format {
        DocumentFormat::PlainText => text::extract_text(path)?,
        DocumentFormat::Markdown => text::extract_markdown(path)?,
        DocumentFormat::Pdf => pdf::extract_pdf(path)?,
        DocumentFormat::Epub => epub::extract_epub(path)?,
    };

    Ok(ExtractedContent {
        sections: sections
            .into_iter()
            .map(|s| Section {
                content: normalize_text(&s.content),
                ..s
            })
            .collect(),
    })
}

/// Strip a leading byte-order mark and convert `\r\n` / `\r` to `\n`
pub fn normalize_text(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.replace("\r\n", "\n").replace('\r', "\n")
}
