//! Lodging and transport lookups against the Amadeus self-service APIs.
//!
//! One `AmadeusClient` holds the OAuth2 client-credentials token and is
//! shared by the hotel and flight providers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::city_codes::city_code;
use super::http_client;
use crate::models::{
    ContextFields, EntityDescriptor, GeoPoint, Itinerary, Leg, LodgingOffer, Price,
    ResolvedPayload, TransportMode, TransportOffer,
};
use crate::pipeline::resolution::{LookupProvider, LookupResult, ProviderError};

pub const AMADEUS_TEST_BASE_URL: &str = "https://test.api.amadeus.com";

/// Refresh the token this long before the server says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Hotels per city passed on to the offers search.
const MAX_HOTEL_IDS: usize = 20;

// ═══════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct AmadeusClient {
    base_url: String,
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            client: http_client(timeout),
            token: Mutex::new(None),
        }
    }

    /// Current bearer token, fetching a new one when missing or close to
    /// expiry. Concurrent callers wait on the same refresh.
    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/v1/security/oauth2/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::HttpClient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(format!("status {}: {body}", status.as_u16())));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        tracing::debug!(expires_in = token.expires_in, "Fetched Amadeus access token");
        *guard = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
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
}

// ═══════════════════════════════════════════════════════════
// Hotels
// ═══════════════════════════════════════════════════════════

pub struct AmadeusHotelProvider {
    client: Arc<AmadeusClient>,
}

impl AmadeusHotelProvider {
    pub fn new(client: Arc<AmadeusClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LookupProvider for AmadeusHotelProvider {
    fn name(&self) -> &str {
        "amadeus-hotels"
    }

    async fn lookup(&self, descriptor: &EntityDescriptor) -> Result<LookupResult, ProviderError> {
        let ContextFields::Lodging(ctx) = &descriptor.context else {
            return Ok(LookupResult::NotFound);
        };

        let Some(code) = [ctx.city.as_deref(), ctx.location.as_deref()]
            .into_iter()
            .flatten()
            .find_map(city_code)
        else {
            tracing::debug!(id = %descriptor.id, "No city code for lodging");
            return Ok(LookupResult::NotFound);
        };

        let (Some(check_in), Some(check_out)) = (ctx.check_in.as_ref(), ctx.check_out.as_ref())
        else {
            tracing::debug!(id = %descriptor.id, "Lodging without stay dates");
            return Ok(LookupResult::NotFound);
        };

        let hotels: DataResponse<HotelListing> = self
            .client
            .get(
                "/v1/reference-data/locations/hotels/by-city",
                &[("cityCode", code.clone())],
            )
            .await?;
        if hotels.data.is_empty() {
            return Ok(LookupResult::NotFound);
        }

        let hotel_ids = hotels
            .data
            .iter()
            .take(MAX_HOTEL_IDS)
            .map(|h| h.hotel_id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let offers: DataResponse<HotelOffers> = self
            .client
            .get(
                "/v3/shopping/hotel-offers",
                &[
                    ("hotelIds", hotel_ids),
                    ("checkInDate", check_in.clone()),
                    ("checkOutDate", check_out.clone()),
                    ("adults", ctx.guests.unwrap_or(1).max(1).to_string()),
                    ("roomQuantity", ctx.rooms.unwrap_or(1).max(1).to_string()),
                    ("bestRateOnly", "true".to_string()),
                ],
            )
            .await?;

        let Some(best) = pick_hotel(offers.data, &descriptor.display_name) else {
            return Ok(LookupResult::NotFound);
        };
        tracing::debug!(id = %descriptor.id, city = %code, hotel = %best.name, "Lodging resolved");
        Ok(LookupResult::Found(ResolvedPayload::Lodging(best)))
    }
}

/// Prefer an offer whose name overlaps the display name, else the first
/// one that has a price.
fn pick_hotel(offers: Vec<HotelOffers>, display_name: &str) -> Option<LodgingOffer> {
    let wanted = display_name.to_lowercase();
    let candidates: Vec<LodgingOffer> = offers
        .into_iter()
        .filter_map(HotelOffers::into_lodging)
        .collect();

    let matching = candidates.iter().position(|o| {
        let name = o.name.to_lowercase();
        !name.is_empty() && (name.contains(&wanted) || wanted.contains(&name))
    });
    let index = matching.unwrap_or(0);
    candidates.into_iter().nth(index)
}

// ═══════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════

pub struct AmadeusTransportProvider {
    client: Arc<AmadeusClient>,
}

impl AmadeusTransportProvider {
    pub fn new(client: Arc<AmadeusClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LookupProvider for AmadeusTransportProvider {
    fn name(&self) -> &str {
        "amadeus-transport"
    }

    async fn lookup(&self, descriptor: &EntityDescriptor) -> Result<LookupResult, ProviderError> {
        let ContextFields::Transport(ctx) = &descriptor.context else {
            return Ok(LookupResult::NotFound);
        };

        if ctx.mode != TransportMode::Flight {
            tracing::debug!(id = %descriptor.id, mode = %ctx.mode, "Transport mode not searchable");
            return Ok(LookupResult::NotFound);
        }

        let (Some(origin), Some(destination), Some(departure)) = (
            ctx.origin.as_ref(),
            ctx.destination.as_ref(),
            ctx.departure_date.as_ref(),
        ) else {
            return Ok(LookupResult::NotFound);
        };

        let mut query = vec![
            ("originLocationCode", origin.trim().to_uppercase()),
            ("destinationLocationCode", destination.trim().to_uppercase()),
            ("departureDate", departure.clone()),
            ("adults", ctx.adults.unwrap_or(1).max(1).to_string()),
            (
                "travelClass",
                ctx.travel_class.clone().unwrap_or_else(|| "ECONOMY".into()),
            ),
            ("max", "5".to_string()),
        ];
        if let Some(return_date) = &ctx.return_date {
            query.push(("returnDate", return_date.clone()));
        }

        let offers: DataResponse<FlightOffer> =
            self.client.get("/v2/shopping/flight-offers", &query).await?;

        // Offers come back sorted by price.
        let Some(best) = offers.data.into_iter().next() else {
            return Ok(LookupResult::NotFound);
        };
        Ok(LookupResult::Found(ResolvedPayload::Transport(best.into_offer())))
    }
}

// ═══════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct DataResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelListing {
    hotel_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelOffers {
    hotel: WireHotel,
    #[serde(default)]
    available: bool,
    #[serde(default)]
    offers: Vec<WireOffer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireHotel {
    hotel_id: String,
    #[serde(default)]
    name: String,
    rating: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    address: Option<WireAddress>,
    #[serde(default)]
    amenities: Vec<String>,
    #[serde(default)]
    media: Vec<WireMedia>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAddress {
    #[serde(default)]
    lines: Vec<String>,
    city_name: Option<String>,
    country_code: Option<String>,
}

#[derive(Deserialize)]
struct WireMedia {
    uri: String,
}

#[derive(Deserialize)]
struct WireOffer {
    price: WirePrice,
}

#[derive(Deserialize)]
struct WirePrice {
    total: String,
    currency: String,
}

impl From<WirePrice> for Price {
    fn from(p: WirePrice) -> Self {
        Price {
            total: p.total,
            currency: p.currency,
        }
    }
}

impl HotelOffers {
    /// Cheapest offer for the hotel; `None` when it has no offers.
    fn into_lodging(self) -> Option<LodgingOffer> {
        let cheapest = self.offers.into_iter().min_by(|a, b| {
            let pa = a.price.total.parse::<f64>().unwrap_or(f64::MAX);
            let pb = b.price.total.parse::<f64>().unwrap_or(f64::MAX);
            pa.total_cmp(&pb)
        })?;

        let hotel = self.hotel;
        let address = hotel.address.map(|a| {
            a.lines
                .into_iter()
                .chain(a.city_name)
                .chain(a.country_code)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        });

        Some(LodgingOffer {
            hotel_id: hotel.hotel_id,
            name: hotel.name,
            price: Some(cheapest.price.into()),
            rating: hotel.rating.and_then(|r| r.parse().ok()),
            location: hotel
                .latitude
                .zip(hotel.longitude)
                .map(|(lat, lng)| GeoPoint { lat, lng }),
            address,
            amenities: hotel.amenities,
            photos: hotel.media.into_iter().map(|m| m.uri).collect(),
            available: self.available,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlightOffer {
    id: String,
    price: WirePrice,
    #[serde(default)]
    itineraries: Vec<WireItinerary>,
    #[serde(default)]
    validating_airline_codes: Vec<String>,
}

#[derive(Deserialize)]
struct WireItinerary {
    duration: Option<String>,
    #[serde(default)]
    segments: Vec<WireSegment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSegment {
    departure: WireEndpoint,
    arrival: WireEndpoint,
    carrier_code: String,
    number: String,
    duration: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEndpoint {
    iata_code: String,
    at: String,
}

impl FlightOffer {
    fn into_offer(self) -> TransportOffer {
        TransportOffer {
            offer_id: self.id,
            mode: TransportMode::Flight,
            price: Some(self.price.into()),
            itineraries: self
                .itineraries
                .into_iter()
                .map(|it| Itinerary {
                    duration: it.duration,
                    legs: it
                        .segments
                        .into_iter()
                        .map(|s| Leg {
                            departure_code: s.departure.iata_code,
                            departure_at: s.departure.at,
                            arrival_code: s.arrival.iata_code,
                            arrival_at: s.arrival.at,
                            carrier_code: s.carrier_code,
                            number: s.number,
                            duration: s.duration,
                        })
                        .collect(),
                })
                .collect(),
            validating_carriers: self.validating_airline_codes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::Query;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use crate::models::{LodgingContext, TransportContext};

    /// Fake Amadeus API; returns (base_url, token request counter).
    async fn mock_amadeus() -> (String, Arc<AtomicUsize>) {
        let token_calls = Arc::new(AtomicUsize::new(0));
        let counter = token_calls.clone();

        let app = Router::new()
            .route(
                "/v1/security/oauth2/token",
                post(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Json(json!({"access_token": "tok", "expires_in": 1799}))
                    }
                }),
            )
            .route(
                "/v1/reference-data/locations/hotels/by-city",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    if q.get("cityCode").map(String::as_str) == Some("PAR") {
                        Json(json!({"data": [{"hotelId": "H1"}, {"hotelId": "H2"}]}))
                    } else {
                        Json(json!({"data": []}))
                    }
                }),
            )
            .route(
                "/v3/shopping/hotel-offers",
                get(|| async {
                    Json(json!({"data": [
                        {
                            "hotel": {"hotelId": "H1", "name": "HOTEL LAMBDA", "latitude": 48.86, "longitude": 2.33},
                            "available": true,
                            "offers": [{"price": {"total": "210.00", "currency": "EUR"}}]
                        },
                        {
                            "hotel": {
                                "hotelId": "H2",
                                "name": "Hotel Plaza Athenee",
                                "rating": "5",
                                "address": {"lines": ["25 Avenue Montaigne"], "cityName": "PARIS", "countryCode": "FR"}
                            },
                            "available": true,
                            "offers": [
                                {"price": {"total": "1450.00", "currency": "EUR"}},
                                {"price": {"total": "1299.00", "currency": "EUR"}}
                            ]
                        }
                    ]}))
                }),
            )
            .route(
                "/v2/shopping/flight-offers",
                get(|| async {
                    Json(json!({"data": [{
                        "id": "1",
                        "price": {"total": "512.30", "currency": "EUR"},
                        "itineraries": [{
                            "duration": "PT7H35M",
                            "segments": [{
                                "departure": {"iataCode": "JFK", "at": "2026-01-24T18:30:00"},
                                "arrival": {"iataCode": "CDG", "at": "2026-01-25T08:05:00"},
                                "carrierCode": "AF",
                                "number": "7",
                                "duration": "PT7H35M"
                            }]
                        }],
                        "validatingAirlineCodes": ["AF"]
                    }]}))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), token_calls)
    }

    fn client(base: &str) -> Arc<AmadeusClient> {
        Arc::new(AmadeusClient::new("id", "secret", base, Duration::from_secs(5)))
    }

    fn plaza(city: &str) -> EntityDescriptor {
        EntityDescriptor::lodging(
            "hotel-plaza-1",
            "Hôtel Plaza Athénée",
            LodgingContext {
                city: Some(city.into()),
                check_in: Some("2026-01-24".into()),
                check_out: Some("2026-01-27".into()),
                guests: Some(2),
                ..Default::default()
            },
        )
    }

    #[test]
    fn pick_hotel_prefers_name_match() {
        let offer = |id: &str, name: &str| HotelOffers {
            hotel: WireHotel {
                hotel_id: id.into(),
                name: name.into(),
                rating: None,
                latitude: None,
                longitude: None,
                address: None,
                amenities: vec![],
                media: vec![],
            },
            available: true,
            offers: vec![WireOffer {
                price: WirePrice {
                    total: "100".into(),
                    currency: "EUR".into(),
                },
            }],
        };
        let picked = pick_hotel(
            vec![offer("A", "Other Hotel"), offer("B", "Le Bristol")],
            "Le Bristol Paris",
        )
        .unwrap();
        assert_eq!(picked.hotel_id, "B");

        let fallback = pick_hotel(vec![offer("A", "Other Hotel")], "Ritz").unwrap();
        assert_eq!(fallback.hotel_id, "A");
        assert!(pick_hotel(vec![], "Ritz").is_none());
    }

    #[tokio::test]
    async fn hotel_lookup_picks_cheapest_offer_of_first_hotel() {
        let (base, _) = mock_amadeus().await;
        let provider = AmadeusHotelProvider::new(client(&base));

        let result = provider.lookup(&plaza("Paris")).await.unwrap();
        let LookupResult::Found(ResolvedPayload::Lodging(offer)) = result else {
            panic!("expected lodging payload, got {result:?}");
        };
        // Accents differ, so no name match: first hotel wins.
        assert_eq!(offer.hotel_id, "H1");
        assert_eq!(offer.price.unwrap().total, "210.00");
        assert!(offer.location.is_some());
    }

    #[tokio::test]
    async fn hotel_without_city_code_is_not_found() {
        let (base, token_calls) = mock_amadeus().await;
        let provider = AmadeusHotelProvider::new(client(&base));
        let result = provider.lookup(&plaza("a small village")).await.unwrap();
        assert_eq!(result, LookupResult::NotFound);
        assert_eq!(token_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn flight_lookup_maps_first_offer_and_reuses_token() {
        let (base, token_calls) = mock_amadeus().await;
        let provider = AmadeusTransportProvider::new(client(&base));
        let flight = EntityDescriptor::transport(
            "jfk-cdg",
            "JFK to Paris flight",
            TransportContext {
                mode: TransportMode::Flight,
                origin: Some("jfk".into()),
                destination: Some("CDG".into()),
                departure_date: Some("2026-01-24".into()),
                adults: Some(2),
                ..Default::default()
            },
        );

        for _ in 0..2 {
            let result = provider.lookup(&flight).await.unwrap();
            let LookupResult::Found(ResolvedPayload::Transport(offer)) = result else {
                panic!("expected transport payload, got {result:?}");
            };
            assert_eq!(offer.price.as_ref().unwrap().total, "512.30");
            assert_eq!(offer.itineraries[0].legs[0].arrival_code, "CDG");
            assert_eq!(offer.validating_carriers, vec!["AF".to_string()]);
        }
        assert_eq!(token_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_flight_transport_is_not_found() {
        let provider = AmadeusTransportProvider::new(client("http://127.0.0.1:9"));
        let transfer = EntityDescriptor::transport(
            "t",
            "Taxi to hotel",
            TransportContext {
                mode: TransportMode::Transfer,
                origin: Some("CDG".into()),
                destination: Some("Hotel".into()),
                ..Default::default()
            },
        );
        assert_eq!(provider.lookup(&transfer).await.unwrap(), LookupResult::NotFound);
    }
}
