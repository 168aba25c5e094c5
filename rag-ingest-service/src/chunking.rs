//! Fixed-size character chunking with overlap.
//!
//! Windows are measured in Unicode scalar values (`char`s), never bytes, so a
//! multi-byte character is never split. A window of `chunk_size` characters
//! starts at every multiple of `chunk_size - overlap_size` below the text
//! length; the last window may be shorter. With `chunk_size = 100` and
//! `overlap_size = 20`, a 250-character text yields windows starting at 0,
//! 80, 160 and 240.

use serde_json::{Map, Value, json};

use crate::error::{ServiceError, ServiceResult};
use crate::ingestion::ExtractedContent;

/// Validated window size and overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    overlap_size: usize,
}

impl ChunkParams {
    /// Requires `0 < overlap_size < chunk_size`.
    pub fn new(chunk_size: usize, overlap_size: usize) -> ServiceResult<Self> {
        if overlap_size == 0 || overlap_size >= chunk_size {
            return Err(ServiceError::InvalidChunkParameters {
                chunk_size,
                overlap_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap_size,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap_size(&self) -> usize {
        self.overlap_size
    }

    /// Distance between consecutive window starts
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap_size
    }
}

/// One window over a text, with char offsets `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Split `text` into overlapping windows. Empty text yields no windows.
pub fn chunk_text(text: &str, params: ChunkParams) -> Vec<TextWindow> {
    // Byte offset of every char boundary, including the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    (0..total_chars)
        .step_by(params.step())
        .map(|start| {
            let end = (start + params.chunk_size).min(total_chars);
            TextWindow {
                text: text[boundaries[start]..boundaries[end]].to_string(),
                start,
                end,
            }
        })
        .collect()
}

/// A chunk ready to be stored, before it is tied to a project and asset
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    /// 1-based position within the source file
    pub order: u32,
    pub text: String,
    pub metadata: Map<String, Value>,
}

/// Chunk every section of an extracted file.
///
/// Sections are chunked independently so no window spans two pages or
/// headings. Orders run 1..=N across the whole file in extraction order.
/// Offsets in the metadata are char offsets within the section.
pub fn chunk_content(content: &ExtractedContent, params: ChunkParams, source: &str) -> Vec<ChunkDraft> {
    let mut drafts = Vec::new();

    for section in &content.sections {
        for window in chunk_text(&section.content, params) {
            let mut metadata = Map::new();
            metadata.insert("source".to_string(), json!(source));
            metadata.insert("start".to_string(), json!(window.start));
            metadata.insert("end".to_string(), json!(window.end));
            if let Some(page) = section.page_number {
                metadata.insert("page".to_string(), json!(page));
            }
            if let Some(title) = &section.title {
                metadata.insert("section".to_string(), json!(title));
            }

            drafts.push(ChunkDraft {
                order: drafts.len() as u32 + 1,
                text: window.text,
                metadata,
            });
        }
    }

    drafts
}
