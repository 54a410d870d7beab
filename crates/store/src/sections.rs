//! Named `## ` sections inside a Markdown blob.
//!
//! The character notes keep one section per character:
//!
//! ```text
//! # Characters
//!
//! ## Mira
//! A cartographer.
//!
//! ## Tomas
//! A sailor.
//! ```
//!
//! A section runs from its `## name` line to the next heading of level one
//! or two, or the end of the text. Deeper headings belong to its body.

/// Written above the first character section.
pub const CHARACTER_HEADING: &str = "# Characters";

/// Level and trimmed text of a Markdown heading line.
fn heading(line: &str) -> Option<(usize, &str)> {
    let line = line.trim();
    let level = line.chars().take_while(|&c| c == '#').count();
    let rest = &line[level..];
    (level > 0 && (rest.is_empty() || rest.starts_with(char::is_whitespace)))
        .then(|| (level, rest.trim()))
}

fn is_section(line: &str, name: &str) -> bool {
    matches!(heading(line), Some((2, n)) if n == name)
}

fn is_boundary(line: &str) -> bool {
    matches!(heading(line), Some((1 | 2, _)))
}

fn entry(name: &str, body: &str) -> String {
    let body = body.trim_end();
    if body.is_empty() {
        format!("## {name}")
    } else {
        format!("## {name}\n{body}")
    }
}

/// Section names in document order.
pub fn section_names(doc: &str) -> Vec<&str> {
    doc.lines()
        .filter_map(heading)
        .filter(|(level, _)| *level == 2)
        .map(|(_, name)| name)
        .collect()
}

/// The body of section `name`, without its heading.
pub fn section_body(doc: &str, name: &str) -> Option<String> {
    let lines: Vec<&str> = doc.lines().collect();
    let start = lines.iter().position(|l| is_section(l, name))?;
    let end = section_end(&lines, start);
    Some(lines[start + 1..end].join("\n").trim().to_string())
}

fn section_end(lines: &[&str], start: usize) -> usize {
    lines[start + 1..]
        .iter()
        .position(|l| is_boundary(l))
        .map_or(lines.len(), |i| start + 1 + i)
}

/// Append a new section. An empty document first gets `title`.
pub fn add_section(doc: &str, title: &str, name: &str, body: &str) -> String {
    let existing = doc.trim_end();
    if existing.is_empty() {
        format!("{title}\n\n{}", entry(name, body))
    } else {
        format!("{existing}\n\n{}", entry(name, body))
    }
}

/// Replace the body of section `name`, leaving every other line as it was.
/// A name with no section is added as with [`add_section`].
pub fn replace_section(doc: &str, title: &str, name: &str, body: &str) -> String {
    let lines: Vec<&str> = doc.lines().collect();
    let Some(start) = lines.iter().position(|l| is_section(l, name)) else {
        return add_section(doc, title, name, body);
    };
    let end = section_end(&lines, start);

    let mut out: Vec<&str> = lines[..start].to_vec();
    let replaced = entry(name, body);
    out.push(&replaced);
    if end < lines.len() {
        out.push("");
        out.extend_from_slice(&lines[end..]);
    }

    let mut text = out.join("\n");
    if doc.ends_with('\n') {
        text.push('\n');
    }
    text
}
