//! Entity descriptors: what the generator claims to have mentioned.
//!
//! The context bag is a tagged union keyed by entity type, so a descriptor
//! can never carry lodging hints while claiming to be a place. On the wire the
//! type travels as a sibling `entity_type` field and the context is decoded
//! against it.

use serde::{Deserialize, Serialize};

use super::enums::{EntityType, TransportMode};
use super::ModelError;

/// One entity the generation response claims to reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor", into = "RawDescriptor")]
pub struct EntityDescriptor {
    pub id: String,
    pub display_name: String,
    pub context: ContextFields,
}

/// Type-specific lookup hints. Only the resolver reads these.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextFields {
    Place(PlaceContext),
    Lodging(LodgingContext),
    Transport(TransportContext),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceContext {
    /// Location hint, e.g. "Paris France 1st arrondissement".
    pub location: Option<String>,
    /// Venue category, e.g. "Restaurant", "Museum".
    pub category: Option<String>,
    /// Pre-built text query for the places provider.
    pub search_query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodgingContext {
    pub location: Option<String>,
    /// City name or IATA city code used for inventory search.
    pub city: Option<String>,
    /// YYYY-MM-DD
    pub check_in: Option<String>,
    /// YYYY-MM-DD
    pub check_out: Option<String>,
    pub guests: Option<u32>,
    pub rooms: Option<u32>,
    pub search_query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportContext {
    pub mode: TransportMode,
    /// IATA code or address.
    pub origin: Option<String>,
    /// IATA code or address.
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
    pub adults: Option<u32>,
    /// ECONOMY | PREMIUM_ECONOMY | BUSINESS | FIRST
    pub travel_class: Option<String>,
}

impl ContextFields {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Place(_) => EntityType::Place,
            Self::Lodging(_) => EntityType::Lodging,
            Self::Transport(_) => EntityType::Transport,
        }
    }

    /// Decode a context object against a declared entity type.
    /// `null` or a missing object yields the type's empty context.
    pub fn from_value(
        entity_type: EntityType,
        value: serde_json::Value,
    ) -> Result<Self, ModelError> {
        let value = if value.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            value
        };

        let invalid = |e: serde_json::Error| ModelError::InvalidContext {
            entity_type,
            reason: e.to_string(),
        };

        Ok(match entity_type {
            EntityType::Place => Self::Place(serde_json::from_value(value).map_err(invalid)?),
            EntityType::Lodging => Self::Lodging(serde_json::from_value(value).map_err(invalid)?),
            EntityType::Transport => {
                Self::Transport(serde_json::from_value(value).map_err(invalid)?)
            }
        })
    }

    fn to_value(&self) -> serde_json::Value {
        let value = match self {
            Self::Place(c) => serde_json::to_value(c),
            Self::Lodging(c) => serde_json::to_value(c),
            Self::Transport(c) => serde_json::to_value(c),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

impl EntityDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, context: ContextFields) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            context,
        }
    }

    pub fn place(id: impl Into<String>, display_name: impl Into<String>, context: PlaceContext) -> Self {
        Self::new(id, display_name, ContextFields::Place(context))
    }

    pub fn lodging(
        id: impl Into<String>,
        display_name: impl Into<String>,
        context: LodgingContext,
    ) -> Self {
        Self::new(id, display_name, ContextFields::Lodging(context))
    }

    pub fn transport(
        id: impl Into<String>,
        display_name: impl Into<String>,
        context: TransportContext,
    ) -> Self {
        Self::new(id, display_name, ContextFields::Transport(context))
    }

    pub fn entity_type(&self) -> EntityType {
        self.context.entity_type()
    }
}

/// Wire shape: `{ id, entity_type, display_name, context }`.
#[derive(Serialize, Deserialize)]
struct RawDescriptor {
    id: String,
    entity_type: EntityType,
    display_name: String,
    #[serde(default)]
    context: serde_json::Value,
}

impl TryFrom<RawDescriptor> for EntityDescriptor {
    type Error = ModelError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err(ModelError::MissingField("id"));
        }
        let context = ContextFields::from_value(raw.entity_type, raw.context)?;
        Ok(Self {
            id: raw.id,
            display_name: raw.display_name,
            context,
        })
    }
}

impl From<EntityDescriptor> for RawDescriptor {
    fn from(d: EntityDescriptor) -> Self {
        Self {
            entity_type: d.entity_type(),
            context: d.context.to_value(),
            id: d.id,
            display_name: d.display_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_place_descriptor() {
        let json = r#"{
            "id": "le-meurice-1",
            "entity_type": "place",
            "display_name": "Le Meurice",
            "context": {"location": "Paris France", "category": "Restaurant"}
        }"#;
        let d: EntityDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.entity_type(), EntityType::Place);
        match &d.context {
            ContextFields::Place(c) => {
                assert_eq!(c.location.as_deref(), Some("Paris France"));
                assert_eq!(c.category.as_deref(), Some("Restaurant"));
                assert!(c.search_query.is_none());
            }
            other => panic!("unexpected context {other:?}"),
        }
    }

    #[test]
    fn missing_context_yields_empty_context() {
        let json = r#"{"id": "t1", "entity_type": "transport", "display_name": "Flight"}"#;
        let d: EntityDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(
            d.context,
            ContextFields::Transport(TransportContext::default())
        );
    }

    #[test]
    fn context_of_wrong_shape_is_rejected() {
        let json = r#"{"id": "h1", "entity_type": "lodging", "display_name": "Ritz",
                       "context": {"guests": "two"}}"#;
        let err = serde_json::from_str::<EntityDescriptor>(json).unwrap_err();
        assert!(err.to_string().contains("lodging"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let json = r#"{"id": "  ", "entity_type": "place", "display_name": "x"}"#;
        assert!(serde_json::from_str::<EntityDescriptor>(json).is_err());
    }

    #[test]
    fn serializes_with_sibling_entity_type() {
        let d = EntityDescriptor::lodging(
            "h1",
            "Hotel Plaza",
            LodgingContext {
                city: Some("Paris".into()),
                guests: Some(2),
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["entity_type"], "lodging");
        assert_eq!(value["context"]["city"], "Paris");
        assert_eq!(value["context"]["guests"], 2);

        let back: EntityDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(back, d);
    }
}
