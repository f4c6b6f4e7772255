use std::fmt;

use crate::models::{ContextFields, EntityDescriptor};

/// Cache key for a lookup: entity type plus normalized lookup inputs.
///
/// Never includes the descriptor id, so the same venue mentioned under
/// different ids (or in different requests) shares one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey(String);

impl LookupKey {
    pub fn for_descriptor(descriptor: &EntityDescriptor) -> Self {
        let name = Some(descriptor.display_name.as_str());
        let parts: Vec<Option<String>> = match &descriptor.context {
            ContextFields::Place(c) => vec![
                name.map(String::from),
                c.location.clone(),
                c.category.clone(),
            ],
            ContextFields::Lodging(c) => vec![
                name.map(String::from),
                c.city.clone().or_else(|| c.location.clone()),
                c.check_in.clone(),
                c.check_out.clone(),
                c.guests.map(|g| g.to_string()),
                c.rooms.map(|r| r.to_string()),
            ],
            ContextFields::Transport(c) => vec![
                Some(c.mode.as_str().to_string()),
                c.origin.clone(),
                c.destination.clone(),
                c.departure_date.clone(),
                c.return_date.clone(),
                c.adults.map(|a| a.to_string()),
                c.travel_class.clone(),
            ],
        };

        let mut key = descriptor.entity_type().as_str().to_string();
        for part in parts {
            key.push(':');
            if let Some(part) = part {
                key.push_str(&normalize_part(&part));
            }
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase, collapse every run of non-alphanumerics to `_`, trim `_`.
fn normalize_part(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LodgingContext, PlaceContext, TransportContext, TransportMode};

    #[test]
    fn normalization_collapses_punctuation_and_case() {
        assert_eq!(normalize_part("  Le Meurice -- Paris!! "), "le_meurice_paris");
        assert_eq!(normalize_part("Hôtel Plaza"), "hôtel_plaza");
        assert_eq!(normalize_part("---"), "");
    }

    #[test]
    fn key_ignores_id() {
        let ctx = PlaceContext {
            location: Some("Paris, France".into()),
            ..Default::default()
        };
        let a = EntityDescriptor::place("1", "Eiffel Tower", ctx.clone());
        let b = EntityDescriptor::place("tower-2", "eiffel  tower", ctx);
        assert_eq!(LookupKey::for_descriptor(&a), LookupKey::for_descriptor(&b));
        assert_eq!(
            LookupKey::for_descriptor(&a).as_str(),
            "place:eiffel_tower:paris_france:"
        );
    }

    #[test]
    fn key_distinguishes_types_and_dates() {
        let hotel_a = EntityDescriptor::lodging(
            "h",
            "Hotel Plaza",
            LodgingContext {
                check_in: Some("2026-01-24".into()),
                ..Default::default()
            },
        );
        let hotel_b = EntityDescriptor::lodging(
            "h",
            "Hotel Plaza",
            LodgingContext {
                check_in: Some("2026-01-25".into()),
                ..Default::default()
            },
        );
        let place = EntityDescriptor::place("h", "Hotel Plaza", PlaceContext::default());
        let ka = LookupKey::for_descriptor(&hotel_a);
        assert_ne!(ka, LookupKey::for_descriptor(&hotel_b));
        assert_ne!(ka, LookupKey::for_descriptor(&place));
    }

    #[test]
    fn transport_key_uses_route_not_display_name() {
        let ctx = TransportContext {
            mode: TransportMode::Flight,
            origin: Some("JFK".into()),
            destination: Some("CDG".into()),
            departure_date: Some("2026-01-24".into()),
            ..Default::default()
        };
        let a = EntityDescriptor::transport("f1", "Morning flight", ctx.clone());
        let b = EntityDescriptor::transport("f2", "JFK to Paris", ctx);
        assert_eq!(LookupKey::for_descriptor(&a), LookupKey::for_descriptor(&b));
        assert!(LookupKey::for_descriptor(&a).to_string().starts_with("transport:flight:jfk:cdg:"));
    }
}
