use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::enums::EntityType;

/// One inline marker found in generated text.
///
/// Offsets are UTF-8 byte offsets into the scanned text, half-open, and cover
/// the whole marker including its open and close tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerOccurrence {
    pub id: String,
    /// Type as written in the tag (aliases already folded).
    pub entity_type: EntityType,
    /// Tag keyword exactly as it appeared, lowercased (`hotel`, `place`, ...).
    pub tag: String,
    pub display_text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Attributes other than `id`, e.g. `context`, `dates`, `route`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl MarkerOccurrence {
    pub fn span(&self) -> Range<usize> {
        self.start_offset..self.end_offset
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
