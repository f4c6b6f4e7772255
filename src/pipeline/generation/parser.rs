use serde::Deserialize;
use serde_json::Value;

use super::{ContentDraft, GenerationError, GenerationResponse};
use crate::models::{
    EntityDescriptor, LodgingContext, PlaceContext, TransportContext, TransportMode,
};

const LOOKUP_HEADER: &str = "LOOKUP_REQUIREMENTS:";

/// Split a first-stage answer into its prose and its lookup requirements.
pub fn split_lookup_requirements(text: &str) -> ContentDraft {
    let full_text = text.trim().to_string();
    match full_text.find(LOOKUP_HEADER) {
        Some(index) => ContentDraft {
            natural_language: full_text[..index].trim().to_string(),
            lookup_requirements: full_text[index..].trim().to_string(),
            full_text,
        },
        None => {
            tracing::warn!("Generated content has no lookup requirements section");
            ContentDraft {
                natural_language: full_text.clone(),
                lookup_requirements: format!("{LOOKUP_HEADER}\n(none generated)"),
                full_text,
            }
        }
    }
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the markup stage's JSON into text and descriptors.
///
/// Accepts `{ markedText, places, hotels, transport }` and
/// `{ text, entities }`. Entity lists are optional and parsed leniently:
/// a malformed item is skipped, a malformed list counts as empty. Output
/// without text is an error.
pub fn parse_generation_output(raw: &str) -> Result<GenerationResponse, GenerationError> {
    let json = strip_code_fences(raw);
    let value: Value =
        serde_json::from_str(json).map_err(|e| GenerationError::MalformedOutput(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(GenerationError::MalformedOutput(
            "expected a JSON object".into(),
        ));
    };

    let text = ["markedText", "text"]
        .iter()
        .find_map(|k| object.get(*k).and_then(Value::as_str))
        .filter(|t| !t.trim().is_empty())
        .ok_or(GenerationError::MissingText)?
        .to_string();

    let mut entities = Vec::new();
    let mut skipped = 0;

    let mut collect = |key: &str, convert: fn(Value) -> Option<EntityDescriptor>| {
        match object.get(key) {
            Some(Value::Array(items)) => {
                for item in items {
                    match convert(item.clone()) {
                        Some(d) => entities.push(d),
                        None => skipped += 1,
                    }
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => {
                tracing::warn!(key, "Entity list is not an array, ignoring");
            }
        }
    };

    collect("entities", |v| serde_json::from_value(v).ok());
    collect("places", place_entity);
    collect("hotels", hotel_entity);
    collect("transport", transport_entity);

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped malformed entity items");
    }
    entities.retain(|d: &EntityDescriptor| !d.id.trim().is_empty());

    Ok(GenerationResponse { text, entities })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceItem {
    id: String,
    name: String,
    context: Option<String>,
    #[serde(rename = "type")]
    category: Option<String>,
    search_query: Option<String>,
}

fn place_entity(value: Value) -> Option<EntityDescriptor> {
    let item: PlaceItem = serde_json::from_value(value).ok()?;
    Some(EntityDescriptor::place(
        item.id,
        item.name,
        PlaceContext {
            location: item.context,
            category: item.category,
            search_query: item.search_query,
        },
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelItem {
    id: String,
    name: String,
    context: Option<String>,
    location: Option<String>,
    check_in_date: Option<String>,
    check_out_date: Option<String>,
    guests: Option<u32>,
    rooms: Option<u32>,
    search_query: Option<String>,
}

fn hotel_entity(value: Value) -> Option<EntityDescriptor> {
    let item: HotelItem = serde_json::from_value(value).ok()?;
    Some(EntityDescriptor::lodging(
        item.id,
        item.name,
        LodgingContext {
            location: item.context,
            city: item.location,
            check_in: item.check_in_date,
            check_out: item.check_out_date,
            guests: item.guests,
            rooms: item.rooms,
            search_query: item.search_query,
        },
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransportItem {
    id: String,
    name: String,
    #[serde(rename = "type")]
    mode: Option<String>,
    origin: Option<String>,
    destination: Option<String>,
    departure_date: Option<String>,
    return_date: Option<String>,
    adults: Option<u32>,
    travel_class: Option<String>,
}

fn transport_entity(value: Value) -> Option<EntityDescriptor> {
    let item: TransportItem = serde_json::from_value(value).ok()?;
    let mode = item
        .mode
        .as_deref()
        .and_then(TransportMode::from_keyword)
        .unwrap_or_default();
    Some(EntityDescriptor::transport(
        item.id,
        item.name,
        TransportContext {
            mode,
            origin: item.origin,
            destination: item.destination,
            departure_date: item.departure_date,
            return_date: item.return_date,
            adults: item.adults,
            travel_class: item.travel_class,
        },
    ))
}
