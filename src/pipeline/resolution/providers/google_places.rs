//! Place lookups against the Google Places web service.
//!
//! Two calls per entity: a text search picks the best candidate, then a
//! details call enriches it. A failed details call degrades to the search
//! result instead of failing the lookup.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::http_client;
use crate::models::{
    ContextFields, EntityDescriptor, GeoPoint, OpeningHours, PhotoRef, PlaceDetails,
    ResolvedPayload,
};
use crate::pipeline::resolution::{LookupProvider, LookupResult, ProviderError};

pub const GOOGLE_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

const DETAIL_FIELDS: &str = "place_id,name,formatted_address,formatted_phone_number,\
international_phone_number,website,url,rating,user_ratings_total,price_level,photos,\
opening_hours,geometry";

pub struct GooglePlacesProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GooglePlacesProvider {
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http_client(timeout),
        }
    }

    /// Free-text query for a place descriptor: the explicit search query if
    /// present, else name, category and location joined.
    pub fn search_query(descriptor: &EntityDescriptor) -> String {
        match &descriptor.context {
            ContextFields::Place(c) => match c.search_query.as_deref().map(str::trim) {
                Some(q) if !q.is_empty() => q.to_string(),
                _ => [
                    Some(descriptor.display_name.as_str()),
                    c.category.as_deref(),
                    c.location.as_deref(),
                ]
                .into_iter()
                .flatten()
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            },
            _ => descriptor.display_name.clone(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("language", "en"), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::HttpClient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }

    async fn details(&self, place_id: &str) -> Result<DetailsResult, ProviderError> {
        let response: DetailsResponse = self
            .get_json("details/json", &[("place_id", place_id), ("fields", DETAIL_FIELDS)])
            .await?;
        match (response.status.as_str(), response.result) {
            ("OK", Some(result)) => Ok(result),
            (status, _) => Err(ProviderError::Rejected(describe_status(
                status,
                response.error_message.as_deref(),
            ))),
        }
    }
}

#[async_trait]
impl LookupProvider for GooglePlacesProvider {
    fn name(&self) -> &str {
        "google-places"
    }

    async fn lookup(&self, descriptor: &EntityDescriptor) -> Result<LookupResult, ProviderError> {
        let query = Self::search_query(descriptor);
        if query.is_empty() {
            return Ok(LookupResult::NotFound);
        }

        let search: TextSearchResponse = self
            .get_json("textsearch/json", &[("query", query.as_str())])
            .await?;

        match search.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(LookupResult::NotFound),
            status => {
                return Err(ProviderError::Rejected(describe_status(
                    status,
                    search.error_message.as_deref(),
                )))
            }
        }

        let Some(candidate) = search.results.into_iter().next() else {
            return Ok(LookupResult::NotFound);
        };

        let details = match self.details(&candidate.place_id).await {
            Ok(details) => details.into_place(),
            Err(e) => {
                tracing::warn!(
                    id = %descriptor.id,
                    place_id = %candidate.place_id,
                    error = %e,
                    "Place details failed, using search result"
                );
                candidate.into_place()
            }
        };

        tracing::debug!(id = %descriptor.id, name = %details.name, "Place resolved");
        Ok(LookupResult::Found(ResolvedPayload::Place(details)))
    }
}

fn describe_status(status: &str, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("{status}: {message}"),
        None => status.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<SearchResult>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct SearchResult {
    place_id: String,
    name: String,
    #[serde(default)]
    formatted_address: String,
    geometry: Option<Geometry>,
    rating: Option<f32>,
    user_ratings_total: Option<u32>,
    price_level: Option<u8>,
}

impl SearchResult {
    fn into_place(self) -> PlaceDetails {
        PlaceDetails {
            place_id: self.place_id,
            name: self.name,
            formatted_address: self.formatted_address,
            rating: self.rating,
            user_ratings_total: self.user_ratings_total,
            price_level: self.price_level,
            location: self.geometry.map(|g| g.location.into()),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<DetailsResult>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct DetailsResult {
    place_id: String,
    name: String,
    #[serde(default)]
    formatted_address: String,
    formatted_phone_number: Option<String>,
    international_phone_number: Option<String>,
    website: Option<String>,
    url: Option<String>,
    rating: Option<f32>,
    user_ratings_total: Option<u32>,
    price_level: Option<u8>,
    #[serde(default)]
    photos: Vec<WirePhoto>,
    opening_hours: Option<WireOpeningHours>,
    geometry: Option<Geometry>,
}

impl DetailsResult {
    fn into_place(self) -> PlaceDetails {
        PlaceDetails {
            place_id: self.place_id,
            name: self.name,
            formatted_address: self.formatted_address,
            rating: self.rating,
            user_ratings_total: self.user_ratings_total,
            price_level: self.price_level,
            phone: self.international_phone_number.or(self.formatted_phone_number),
            website: self.website,
            url: self.url,
            location: self.geometry.map(|g| g.location.into()),
            opening_hours: self.opening_hours.map(|h| OpeningHours {
                open_now: h.open_now,
                weekday_text: h.weekday_text,
            }),
            photos: self
                .photos
                .into_iter()
                .map(|p| PhotoRef {
                    reference: p.photo_reference,
                    width: p.width,
                    height: p.height,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct Geometry {
    location: WireLatLng,
}

#[derive(Deserialize)]
struct WireLatLng {
    lat: f64,
    lng: f64,
}

impl From<WireLatLng> for GeoPoint {
    fn from(p: WireLatLng) -> Self {
        GeoPoint { lat: p.lat, lng: p.lng }
    }
}

#[derive(Deserialize)]
struct WirePhoto {
    photo_reference: String,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct WireOpeningHours {
    open_now: Option<bool>,
    #[serde(default)]
    weekday_text: Vec<String>,
}
