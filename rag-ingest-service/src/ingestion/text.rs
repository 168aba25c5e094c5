//! Plain text and Markdown extraction.

use std::path::Path;

use crate::error::{ProcessingError, ServiceResult};

use super::Section;

/// Extract a plain text file as a single section.
pub fn extract_text(path: &Path) -> ServiceResult<Vec<Section>> {
    let content = std::fs::read_to_string(path).map_err(ProcessingError::Io)?;

    Ok(vec![Section {
        title: None,
        content: content.trim().to_string(),
        page_number: None,
    }])
}

/// Extract a Markdown file, split on ATX headings.
pub fn extract_markdown(path: &Path) -> ServiceResult<Vec<Section>> {
    let content = std::fs::read_to_string(path).map_err(ProcessingError::Io)?;
    Ok(parse_markdown_sections(&content))
}

/// Split Markdown into sections at `#`..`######` headings.
///
/// Heading lines become section titles and are not part of the content.
/// Lines inside fenced code blocks are never treated as headings.
pub fn parse_markdown_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut body = String::new();
    let mut title: Option<String> = None;
    let mut in_fence = false;

    let mut flush = |title: Option<String>, body: &mut String| {
        let text = body.trim();
        if !text.is_empty() {
            sections.push(Section {
                title,
                content: text.to_string(),
                page_number: None,
            });
        }
        body.clear();
    };

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }

        if !in_fence && let Some(heading) = heading_text(line) {
            flush(title.take(), &mut body);
            title = Some(heading);
            continue;
        }

        body.push_str(line);
        body.push('\n');
    }
    flush(title, &mut body);

    sections
}

/// Text of an ATX heading line, if `line` is one
fn heading_text(line: &str) -> Option<String> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }

    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }

    Some(rest.trim().trim_end_matches('#').trim_end().to_string())
}
