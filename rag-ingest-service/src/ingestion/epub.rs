//! EPUB extraction, one section per spine item.

use std::path::Path;

use tracing::debug;

use crate::error::{ProcessingError, ServiceError, ServiceResult};

use super::Section;

/// Extract text from an EPUB in reading order.
///
/// Every spine item with visible text becomes a section numbered from 1.
pub fn extract_epub(path: &Path) -> ServiceResult<Vec<Section>> {
    let mut archive =
        epub::doc::EpubDoc::new(path).map_err(|e| ProcessingError::EpubRead(e.to_string()))?;

    let mut sections = Vec::new();
    let mut chapter = 1u32;

    loop {
        if let Some((content, _mime)) = archive.get_current_str() {
            let text = html_to_text(&content);
            if !text.is_empty() {
                sections.push(Section {
                    title: archive.get_current_id(),
                    content: text,
                    page_number: Some(chapter),
                });
                chapter += 1;
            }
        }

        if !archive.go_next() {
            break;
        }
    }

    if sections.is_empty() {
        return Err(ServiceError::Processing(ProcessingError::EpubRead(
            "No content could be extracted from EPUB".to_string(),
        )));
    }

    debug!(chapters = sections.len(), "EPUB extracted");

    Ok(sections)
}

const SKIPPED_ELEMENTS: [&str; 3] = ["head", "script", "style"];
const BLOCK_ELEMENTS: [&str; 14] = [
    "p", "br", "div", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "section",
];

/// Convert XHTML to plain text.
///
/// Block elements end a line, `head`/`script`/`style` contents are dropped,
/// runs of spaces collapse, and the common named entities are decoded.
pub fn html_to_text(html: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut skip_depth = 0usize;
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        if skip_depth == 0 {
            push_text(&mut line, &rest[..open]);
        }

        let Some(close) = rest[open..].find('>') else {
            rest = "";
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let closing = tag.starts_with('/');
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let self_closing = tag.ends_with('/');

        if SKIPPED_ELEMENTS.contains(&name.as_str()) && !self_closing {
            if closing {
                skip_depth = skip_depth.saturating_sub(1);
            } else {
                skip_depth += 1;
            }
            continue;
        }

        if BLOCK_ELEMENTS.contains(&name.as_str()) {
            end_line(&mut lines, &mut line);
        } else if !line.ends_with(' ') && !line.is_empty() {
            line.push(' ');
        }
    }
    if skip_depth == 0 {
        push_text(&mut line, rest);
    }
    end_line(&mut lines, &mut line);

    decode_entities(&lines.join("\n"))
}

fn push_text(line: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() {
            if !line.is_empty() && !line.ends_with(' ') {
                line.push(' ');
            }
        } else {
            line.push(c);
        }
    }
}

fn end_line(lines: &mut Vec<String>, line: &mut String) {
    let text = line.trim();
    if !text.is_empty() {
        lines.push(text.to_string());
    }
    line.clear();
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
