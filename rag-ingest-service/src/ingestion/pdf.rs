//! PDF text extraction, one section per page.

use std::path::Path;

use pdfium_render::prelude::*;
use tracing::{debug, warn};

use crate::error::{ProcessingError, ServiceError, ServiceResult};

use super::Section;

/// Create a Pdfium instance (dynamically linked).
///
/// Searches for libpdfium in:
/// 1. Current directory (./libpdfium.so)
/// 2. vendor/pdfium/lib/
/// 3. System library paths
pub fn create_pdfium() -> Result<Pdfium, ProcessingError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ProcessingError::TextExtraction {
            page: 0,
            source: Box::new(std::io::Error::other(format!(
                "Failed to load PDFium library: {:?}",
                e
            ))),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Extract the text of every page that has any.
///
/// Page numbers are 1-based. A page whose text layer cannot be read is
/// skipped with a warning; a document with no text at all is an error.
pub fn extract_pdf(path: &Path) -> ServiceResult<Vec<Section>> {
    let pdfium = create_pdfium()?;

    let document =
        pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| ProcessingError::TextExtraction {
                page: 0,
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Failed to load PDF: {:?}", e),
                )),
            })?;

    let page_count = document.pages().len();
    let mut sections = Vec::new();

    for (page_index, page) in document.pages().iter().enumerate() {
        let page_num = page_index as u32 + 1;

        let text = match page.text() {
            Ok(text) => text,
            Err(e) => {
                warn!(page = page_num, error = ?e, "Failed to get text object for page");
                continue;
            }
        };

        let page_text = text.all().trim().to_string();
        if !page_text.is_empty() {
            sections.push(Section {
                title: None,
                content: page_text,
                page_number: Some(page_num),
            });
        }
    }

    if sections.is_empty() {
        return Err(ServiceError::Processing(ProcessingError::TextExtraction {
            page: 0,
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "No text could be extracted from PDF",
            )),
        }));
    }

    debug!(
        pages = page_count,
        pages_with_text = sections.len(),
        "PDF text extracted"
    );

    Ok(sections)
}
