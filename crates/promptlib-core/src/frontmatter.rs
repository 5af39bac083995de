//! Frontmatter splitting.
//!
//! A document is a `---` line, a YAML mapping, another `---` line, then
//! free text:
//!
//! ```text
//! ---
//! id: review-pr
//! tags: [reviews]
//! ---
//! Review the pull request for ...
//! ```

use serde_yaml::{Mapping, Value};

use crate::error::FrontmatterError;

const DELIMITER: &str = "---";
const BOM: char = '\u{feff}';

/// Split raw document text into its header mapping and body.
///
/// The first non-blank line must be the opening delimiter. An empty header
/// block yields an empty mapping. The body loses leading and trailing line
/// breaks only; everything else is kept byte for byte.
pub fn parse_frontmatter(raw: &str) -> Result<(Mapping, String), FrontmatterError> {
    let text = raw.trim_start_matches(BOM);
    let mut lines = lines_with_offsets(text);

    let header_start = loop {
        match lines.next() {
            Some((_, line, end)) if is_delimiter(line) => break end,
            Some((_, line, _)) if line.trim().is_empty() => continue,
            _ => return Err(FrontmatterError::MissingOpening),
        }
    };

    let (header_end, body_start) = lines
        .find(|(_, line, _)| is_delimiter(line))
        .map(|(start, _, end)| (start, end))
        .ok_or(FrontmatterError::Unterminated)?;

    let header = parse_header(&text[header_start..header_end])?;
    let body = text[body_start..]
        .trim_matches(|c| c == '\r' || c == '\n')
        .to_string();

    Ok((header, body))
}

/// Serialize a header mapping and body back into document text.
///
/// For a body without leading or trailing line breaks,
/// `parse_frontmatter(&render_document(h, b)?)` returns `(h, b)`.
pub fn render_document(header: &Mapping, body: &str) -> Result<String, FrontmatterError> {
    let yaml =
        serde_yaml::to_string(header).map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{body}\n"))
}

fn parse_header(block: &str) -> Result<Mapping, FrontmatterError> {
    if block.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let value: Value =
        serde_yaml::from_str(block).map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(FrontmatterError::NotAMapping),
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Yields `(start, line, end)` for each line, where `line` excludes the
/// terminator and `end` is the offset just past it.
fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str, usize)> {
    text.split_inclusive('\n').scan(0usize, |offset, chunk| {
        let start = *offset;
        *offset += chunk.len();
        let line = chunk.trim_end_matches(['\n', '\r']);
        Some((start, line, *offset))
    })
}
