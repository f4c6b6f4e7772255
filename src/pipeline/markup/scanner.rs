use std::collections::BTreeMap;

use crate::models::{EntityType, MarkerOccurrence};

/// Find every well-formed entity marker in `text`, in order of appearance.
///
/// Malformed markers (unknown tag, missing id, unterminated, or wrapping
/// another marker opening) are skipped and stay plain text. Never fails.
pub fn scan_markers(text: &str) -> Vec<MarkerOccurrence> {
    MarkerScanner::new(text).collect()
}

/// Single left-to-right pass over generated text, yielding markers lazily.
///
/// Each opening tag is followed forward until its closing tag or the next
/// opening tag, whichever comes first, and scanning resumes from there, so
/// no byte is walked more than a constant number of times.
pub struct MarkerScanner<'a> {
    text: &'a str,
    pos: usize,
}

/// Outcome of examining one `<`.
enum Step {
    Found(MarkerOccurrence),
    /// No marker starts here; continue scanning at this byte.
    Resume(usize),
}

impl<'a> MarkerScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Try to read a complete marker starting at byte `lt` (which holds `<`).
    fn step_at(&self, lt: usize) -> Step {
        // '<' is one byte, so lt + 1 is always a char boundary.
        let Some(open) = parse_open_tag(self.text, lt) else {
            return Step::Resume(lt + 1);
        };

        match find_body_end(self.text, open.end, &open.tag) {
            BodyEnd::Close { start, end } => Step::Found(MarkerOccurrence {
                id: open.id,
                entity_type: open.entity_type,
                tag: open.tag,
                display_text: self.text[open.end..start].to_string(),
                start_offset: lt,
                end_offset: end,
                attributes: open.attributes,
            }),
            BodyEnd::Nested(at) => {
                tracing::debug!(offset = lt, tag = %open.tag, "Skipping marker wrapping a nested marker");
                Step::Resume(at)
            }
            BodyEnd::Unterminated => Step::Resume(open.end),
        }
    }
}

impl Iterator for MarkerScanner<'_> {
    type Item = MarkerOccurrence;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            let lt = self.pos + self.text[self.pos..].find('<')?;
            match self.step_at(lt) {
                Step::Found(marker) => {
                    self.pos = marker.end_offset;
                    return Some(marker);
                }
                Step::Resume(at) => self.pos = at,
            }
        }
        None
    }
}

// ═══════════════════════════════════════════════════════════
// Tag parsing
// ═══════════════════════════════════════════════════════════

struct OpenTag {
    tag: String,
    entity_type: EntityType,
    id: String,
    attributes: BTreeMap<String, String>,
    /// Byte just past the closing `>`.
    end: usize,
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn parse_open_tag(text: &str, lt: usize) -> Option<OpenTag> {
    let bytes = text.as_bytes();
    let mut i = lt + 1;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let tag = text[lt + 1..i].to_ascii_lowercase();
    let entity_type = EntityType::from_keyword(&tag)?;

    let mut attributes = BTreeMap::new();
    loop {
        let before_ws = i;
        i = skip_whitespace(bytes, i);
        match *bytes.get(i)? {
            b'>' => {
                i += 1;
                break;
            }
            // Attributes must be separated from the tag name and from each other.
            _ if i == before_ws => return None,
            _ => {}
        }

        let name_start = i;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            return None;
        }
        let name = text[name_start..i].to_ascii_lowercase();

        i = skip_whitespace(bytes, i);
        if *bytes.get(i)? != b'=' {
            return None;
        }
        i = skip_whitespace(bytes, i + 1);

        let quote = *bytes.get(i)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = i + 1;
        let value_end = value_start + text[value_start..].find(quote as char)?;
        attributes
            .entry(name)
            .or_insert_with(|| text[value_start..value_end].to_string());
        i = value_end + 1;
    }

    // Ids are opaque: kept verbatim so they match descriptor ids byte for byte.
    let id = attributes.remove("id")?;
    if id.trim().is_empty() {
        return None;
    }

    Some(OpenTag {
        tag,
        entity_type,
        id,
        attributes,
        end: i,
    })
}

enum BodyEnd {
    /// Byte range of the matching closing tag.
    Close { start: usize, end: usize },
    /// Another marker opens at this byte before the closing tag.
    Nested(usize),
    Unterminated,
}

/// Walk forward from `from` to the first `</tag>` or parsable opening tag.
///
/// Opening tags are tested before being stepped over, so a `</tag>` inside
/// a later marker's quoted attribute never closes the current one.
fn find_body_end(text: &str, from: usize, tag: &str) -> BodyEnd {
    let bytes = text.as_bytes();
    let mut search = from;
    while let Some(rel) = text[search..].find('<') {
        let at = search + rel;
        if let Some(end) = close_tag_at(bytes, at, tag) {
            return BodyEnd::Close { start: at, end };
        }
        if parse_open_tag(text, at).is_some() {
            return BodyEnd::Nested(at);
        }
        search = at + 1;
    }
    BodyEnd::Unterminated
}

/// End of `</tag>` at byte `at` (case-insensitive, whitespace allowed before `>`).
fn close_tag_at(bytes: &[u8], at: usize, tag: &str) -> Option<usize> {
    if bytes.get(at + 1) != Some(&b'/') {
        return None;
    }
    let name_start = at + 2;
    let name_end = name_start + tag.len();
    if name_end > bytes.len() || !bytes[name_start..name_end].eq_ignore_ascii_case(tag.as_bytes()) {
        return None;
    }
    let gt = skip_whitespace(bytes, name_end);
    (bytes.get(gt) == Some(&b'>')).then_some(gt + 1)
}
