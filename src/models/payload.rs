use serde::{Deserialize, Serialize};

use super::enums::{EntityType, TransportMode};

/// Type-specific resolved data. The variant always matches the entity type
/// of the descriptor it was looked up for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedPayload {
    Place(PlaceDetails),
    Lodging(LodgingOffer),
    Transport(TransportOffer),
}

impl ResolvedPayload {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Place(_) => EntityType::Place,
            Self::Lodging(_) => EntityType::Lodging,
            Self::Transport(_) => EntityType::Transport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Decimal string as quoted by the provider, e.g. "412.80".
    pub total: String,
    pub currency: String,
}

// ═══════════════════════════════════════════════════════════
// Places
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub place_id: String,
    pub name: String,
    pub formatted_address: String,
    pub rating: Option<f32>,
    pub user_ratings_total: Option<u32>,
    pub price_level: Option<u8>,
    pub phone: Option<String>,
    pub website: Option<String>,
    /// Maps deep link.
    pub url: Option<String>,
    pub location: Option<GeoPoint>,
    pub opening_hours: Option<OpeningHours>,
    #[serde(default)]
    pub photos: Vec<PhotoRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub open_now: Option<bool>,
    #[serde(default)]
    pub weekday_text: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub reference: String,
    pub width: u32,
    pub height: u32,
}

// ═══════════════════════════════════════════════════════════
// Lodging
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodgingOffer {
    pub hotel_id: String,
    pub name: String,
    pub price: Option<Price>,
    pub rating: Option<f32>,
    pub location: Option<GeoPoint>,
    pub address: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub available: bool,
}

// ═══════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOffer {
    pub offer_id: String,
    pub mode: TransportMode,
    pub price: Option<Price>,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
    #[serde(default)]
    pub validating_carriers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    /// ISO 8601 duration, e.g. "PT7H35M".
    pub duration: Option<String>,
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub departure_code: String,
    pub departure_at: String,
    pub arrival_code: String,
    pub arrival_at: String,
    pub carrier_code: String,
    pub number: String,
    pub duration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_kind_tag() {
        let payload = ResolvedPayload::Place(PlaceDetails {
            place_id: "abc".into(),
            name: "Eiffel Tower".into(),
            formatted_address: "Champ de Mars, Paris".into(),
            rating: Some(4.7),
            ..Default::default()
        });
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["kind"], "place");
        assert_eq!(value["name"], "Eiffel Tower");
        assert_eq!(payload.entity_type(), EntityType::Place);
    }

    #[test]
    fn transport_payload_reports_its_type() {
        let payload = ResolvedPayload::Transport(TransportOffer {
            offer_id: "1".into(),
            mode: TransportMode::Flight,
            price: Some(Price {
                total: "512.30".into(),
                currency: "EUR".into(),
            }),
            itineraries: vec![],
            validating_carriers: vec!["AF".into()],
        });
        assert_eq!(payload.entity_type(), EntityType::Transport);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["kind"], "transport");
        assert_eq!(value["mode"], "flight");
    }
}
