//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::models::EntityType;
use crate::pipeline::resolution::CacheStats;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub generator_configured: bool,
    /// Entity types with a lookup provider.
    pub providers: Vec<EntityType>,
    pub cache: CacheStats,
}

/// `GET /api/health`
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let resolver = ctx.pipeline.resolver();
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        generator_configured: ctx.pipeline.has_generator(),
        providers: resolver.registry().registered_types(),
        cache: resolver.cache().stats(),
    })
}
