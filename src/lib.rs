pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Entry point for the binary: logging, configuration, then the HTTP server
/// until Ctrl-C.
pub async fn run() -> Result<(), api::ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env();
    tracing::info!(
        bind_addr = %config.bind_addr,
        generator = config.openai.is_some(),
        places = config.google_places_api_key.is_some(),
        amadeus = config.amadeus.is_some(),
        max_in_flight = config.resolver.max_in_flight,
        "Configuration loaded"
    );

    api::serve(config).await
}
