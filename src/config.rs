use std::net::SocketAddr;
use std::time::Duration;

use crate::pipeline::generation::{DEFAULT_CONTENT_MODEL, DEFAULT_MARKUP_MODEL, OPENAI_BASE_URL};
use crate::pipeline::resolution::providers::{AMADEUS_TEST_BASE_URL, GOOGLE_PLACES_BASE_URL};
use crate::pipeline::resolution::{CacheTtls, ResolverConfig};

/// Application-level constants
pub const APP_NAME: &str = "tripmark";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(90);

/// Debug builds log the crate at debug level.
pub fn is_dev() -> bool {
    cfg!(debug_assertions)
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if is_dev() {
        "info,tripmark_lib=debug,tower_http=debug"
    } else {
        "info"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub content_model: String,
    pub markup_model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmadeusSettings {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

/// Runtime configuration. Every external service is optional: a missing
/// credential disables that service instead of failing startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub openai: Option<OpenAiSettings>,
    pub google_places_api_key: Option<String>,
    pub google_places_base_url: String,
    pub amadeus: Option<AmadeusSettings>,
    pub resolver: ResolverConfig,
    pub ttls: CacheTtls,
    pub generation_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Blank values count as unset;
    /// unparsable values fall back to defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = parse_or(&get, "TRIPMARK_BIND_ADDR", default_bind_addr());

        let openai = get("OPENAI_API_KEY").map(|api_key| OpenAiSettings {
            api_key,
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            content_model: get("TRIPMARK_CONTENT_MODEL")
                .unwrap_or_else(|| DEFAULT_CONTENT_MODEL.to_string()),
            markup_model: get("TRIPMARK_MARKUP_MODEL")
                .unwrap_or_else(|| DEFAULT_MARKUP_MODEL.to_string()),
        });

        let google_places_api_key =
            get("GOOGLE_PLACES_API_KEY").or_else(|| get("GOOGLE_MAPS_API_KEY"));

        let amadeus = match (get("AMADEUS_CLIENT_ID"), get("AMADEUS_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(AmadeusSettings {
                client_id,
                client_secret,
                base_url: get("AMADEUS_BASE_URL")
                    .unwrap_or_else(|| AMADEUS_TEST_BASE_URL.to_string()),
            }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("Only one of AMADEUS_CLIENT_ID / AMADEUS_CLIENT_SECRET is set, ignoring both");
                None
            }
            (None, None) => None,
        };

        let defaults = ResolverConfig::default();
        let max_in_flight = match parse_or(&get, "TRIPMARK_MAX_IN_FLIGHT", defaults.max_in_flight) {
            0 => {
                tracing::warn!("TRIPMARK_MAX_IN_FLIGHT must be at least 1, using default");
                defaults.max_in_flight
            }
            n => n,
        };
        let resolver = ResolverConfig {
            max_in_flight,
            lookup_timeout: seconds_or(&get, "TRIPMARK_LOOKUP_TIMEOUT_SECS", defaults.lookup_timeout),
        };

        Self {
            bind_addr,
            openai,
            google_places_api_key,
            google_places_base_url: GOOGLE_PLACES_BASE_URL.to_string(),
            amadeus,
            resolver,
            ttls: CacheTtls::default(),
            generation_timeout: seconds_or(
                &get,
                "TRIPMARK_GENERATION_TIMEOUT_SECS",
                DEFAULT_GENERATION_TIMEOUT,
            ),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!(key, value = %raw, error = %e, "Invalid config value, using default");
            default
        }),
        None => default,
    }
}

fn seconds_or(get: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    match parse_or::<u64>(get, key, default.as_secs()) {
        0 => {
            tracing::warn!(key, "Timeout must be at least one second, using default");
            default
        }
        secs => Duration::from_secs(secs),
    }
}
