pub mod amadeus;
pub mod city_codes;
pub mod google_places;

pub use amadeus::*;
pub use google_places::*;

use std::sync::Arc;
use std::time::Duration;

use super::ProviderRegistry;
use crate::config::AppConfig;
use crate::models::EntityType;

/// Shared HTTP client settings for provider adapters.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tripmark/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "HTTP client builder failed, using defaults");
            reqwest::Client::new()
        })
}

/// Register a provider for every entity type whose credentials are present.
/// Types left unregistered resolve as not found.
pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    let timeout = config.resolver.lookup_timeout;

    match &config.google_places_api_key {
        Some(key) => registry.register(
            EntityType::Place,
            Arc::new(GooglePlacesProvider::new(key.clone(), &config.google_places_base_url, timeout)),
        ),
        None => tracing::warn!("GOOGLE_PLACES_API_KEY not set, places will not resolve"),
    }

    match &config.amadeus {
        Some(amadeus) => {
            let client = Arc::new(AmadeusClient::new(
                amadeus.client_id.clone(),
                amadeus.client_secret.clone(),
                &amadeus.base_url,
                timeout,
            ));
            registry.register(
                EntityType::Lodging,
                Arc::new(AmadeusHotelProvider::new(client.clone())),
            );
            registry.register(
                EntityType::Transport,
                Arc::new(AmadeusTransportProvider::new(client)),
            );
        }
        None => tracing::warn!("Amadeus credentials not set, lodging and transport will not resolve"),
    }

    registry
}
