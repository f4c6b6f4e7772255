use serde::{Deserialize, Serialize};

use super::enums::EntityType;
use super::record::ResolvedRecord;

/// One renderable unit of the final message.
///
/// JSON: `{"kind":"text","content":"..."}` or
/// `{"kind":"place","id":"...","display_text":"...","resolved":{...}|null}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageSegment {
    Text { content: String },
    Place(EntitySegment),
    Lodging(EntitySegment),
    Transport(EntitySegment),
}

/// An entity mention. `resolved` is `None` when the id had no descriptor or
/// no resolution record; renderers show that as an inert state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySegment {
    pub id: String,
    pub display_text: String,
    pub resolved: Option<ResolvedRecord>,
}

impl MessageSegment {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn entity(entity_type: EntityType, segment: EntitySegment) -> Self {
        match entity_type {
            EntityType::Place => Self::Place(segment),
            EntityType::Lodging => Self::Lodging(segment),
            EntityType::Transport => Self::Transport(segment),
        }
    }

    /// `None` for text segments.
    pub fn entity_type(&self) -> Option<EntityType> {
        match self {
            Self::Text { .. } => None,
            Self::Place(_) => Some(EntityType::Place),
            Self::Lodging(_) => Some(EntityType::Lodging),
            Self::Transport(_) => Some(EntityType::Transport),
        }
    }

    pub fn as_entity(&self) -> Option<&EntitySegment> {
        match self {
            Self::Text { .. } => None,
            Self::Place(s) | Self::Lodging(s) | Self::Transport(s) => Some(s),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// The visible characters this segment contributes to the message.
    pub fn display_content(&self) -> &str {
        match self {
            Self::Text { content } => content,
            Self::Place(s) | Self::Lodging(s) | Self::Transport(s) => &s.display_text,
        }
    }
}
