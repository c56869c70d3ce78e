use serde_yaml::Value;

use crate::model::note::FrontMatter;

const FENCE: &str = "---";

/// A note split at its metadata fence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteParts<'a> {
    /// Raw YAML between the fences. `None` when the note has no block.
    pub yaml: Option<&'a str>,
    pub body: &'a str,
}

/// Split a note into its YAML block and body.
///
/// The block must open on the very first line with `---` and close on a
/// later line that is exactly `---`. Anything else is all body.
pub fn split(text: &str) -> NoteParts<'_> {
    let no_block = NoteParts {
        yaml: None,
        body: text,
    };
    let Some(rest) = strip_fence_line(text) else {
        return no_block;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == FENCE {
            return NoteParts {
                yaml: Some(&rest[..offset]),
                body: &rest[offset + line.len()..],
            };
        }
        offset += line.len();
    }
    no_block
}

fn strip_fence_line(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(FENCE)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

/// Parse a YAML block into ordered front matter. An empty block is an empty map.
pub fn parse_yaml(yaml: &str) -> Result<FrontMatter, serde_yaml::Error> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::new());
    }
    let value: Value = serde_yaml::from_str(yaml)?;
    if value.is_null() {
        return Ok(FrontMatter::new());
    }
    serde_yaml::from_value(value)
}

/// Front matter of a whole note. `Ok(None)` when the note has no block.
pub fn parse_front_matter(text: &str) -> Result<Option<FrontMatter>, serde_yaml::Error> {
    split(text).yaml.map(parse_yaml).transpose()
}

/// Serialize front matter and body back into note text. An empty map
/// writes no block at all.
pub fn render_note(fm: &FrontMatter, body: &str) -> Result<String, serde_yaml::Error> {
    if fm.is_empty() {
        return Ok(body.to_string());
    }
    let yaml = serde_yaml::to_string(fm)?;
    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(body);
    Ok(out)
}

/// First line of a body, without its line ending
pub fn first_line(body: &str) -> &str {
    body.lines().next().unwrap_or("")
}

/// Body with its first line removed
pub fn drop_first_line(body: &str) -> &str {
    match body.find('\n') {
        Some(idx) => &body[idx + 1..],
        None => "",
    }
}
