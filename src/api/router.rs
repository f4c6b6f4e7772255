//! API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Access log

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

pub fn api_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/pipeline/run", post(endpoints::pipeline::run))
        .route("/pipeline/segments", post(endpoints::pipeline::segments))
        .route("/pipeline/resolve", post(endpoints::pipeline::resolve))
        .route("/pipeline/assemble", post(endpoints::pipeline::assemble))
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(axum::middleware::from_fn(middleware::access_log::log_access))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::models::{EntityDescriptor, EntityType, PlaceDetails, ResolvedPayload};
    use crate::pipeline::generation::{
        ContentGenerator, GenerationError, GenerationRequest, GenerationResponse,
    };
    use crate::pipeline::resolution::{
        EntityResolver, LookupCache, LookupProvider, LookupResult, ProviderError,
        ProviderRegistry, ResolverConfig,
    };
    use crate::pipeline::Pipeline;

    struct TowerGenerator;

    #[async_trait]
    impl ContentGenerator for TowerGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResponse, GenerationError> {
            if request.query.contains("fail") {
                return Err(GenerationError::Timeout(90));
            }
            Ok(GenerationResponse {
                text: r#"Visit <place id="1">the tower</place> at noon."#.into(),
                entities: vec![EntityDescriptor::place("1", "Eiffel Tower", Default::default())],
            })
        }
    }

    struct EchoPlaces;

    #[async_trait]
    impl LookupProvider for EchoPlaces {
        fn name(&self) -> &str {
            "echo-places"
        }

        async fn lookup(&self, d: &EntityDescriptor) -> Result<LookupResult, ProviderError> {
            Ok(LookupResult::Found(ResolvedPayload::Place(PlaceDetails {
                place_id: format!("pid-{}", d.id),
                name: d.display_name.clone(),
                ..Default::default()
            })))
        }
    }

    fn app(with_generator: bool) -> Router {
        let generator = with_generator.then(|| Arc::new(TowerGenerator) as Arc<dyn ContentGenerator>);
        let registry = ProviderRegistry::new().with(EntityType::Place, Arc::new(EchoPlaces));
        let resolver = EntityResolver::new(
            registry,
            Arc::new(LookupCache::default()),
            ResolverConfig::default(),
        );
        api_router(ApiContext::new(Pipeline::new(generator, resolver)))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_configuration() {
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let response = app(false).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["generator_configured"], false);
        assert_eq!(json["providers"], json!(["place"]));
    }

    #[tokio::test]
    async fn run_returns_segments() {
        let response = app(true)
            .oneshot(post_json("/api/pipeline/run", json!({"query": "Paris?"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        let segments = json["segments"].as_array().unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], json!({"kind": "text", "content": "Visit "}));
        assert_eq!(segments[1]["kind"], "place");
        assert_eq!(segments[1]["resolved"]["found"], true);
        assert_eq!(json["summary"]["found"], 1);
    }

    #[tokio::test]
    async fn run_rejects_empty_query() {
        let response = app(true)
            .oneshot(post_json("/api/pipeline/run", json!({"query": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn run_maps_generation_failure_to_502() {
        let response = app(true)
            .oneshot(post_json("/api/pipeline/run", json!({"query": "please fail"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "GENERATION_FAILED");
    }

    #[tokio::test]
    async fn run_without_generator_is_503() {
        let response = app(false)
            .oneshot(post_json("/api/pipeline/run", json!({"query": "Paris?"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn segments_tolerates_malformed_entities() {
        let body = json!({
            "text": "See <place id=\"a\">A</place> and <place id=\"b\">B</place>.",
            "entities": [
                {"id": "a", "entity_type": "place", "display_name": "A"},
                {"id": "b", "entity_type": "castle", "display_name": "B"},
                "garbage"
            ]
        });
        let response = app(false)
            .oneshot(post_json("/api/pipeline/segments", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["segments"][1]["resolved"]["found"], true);
        assert!(json["segments"][3]["resolved"].is_null());
        assert_eq!(json["diagnostics"]["missing_descriptors"], json!(["b"]));
    }

    #[tokio::test]
    async fn resolve_returns_records_and_summary() {
        let body = json!({"entities": [{"id": "a", "entity_type": "place", "display_name": "A"}]});
        let response = app(false)
            .oneshot(post_json("/api/pipeline/resolve", body))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["records"]["a"]["found"], true);
        assert_eq!(json["summary"]["requested"], 1);
    }

    #[tokio::test]
    async fn assemble_uses_supplied_records() {
        let body = json!({
            "text": "Stay at <lodging id=\"h\">the Ritz</lodging>.",
            "entities": [{"id": "h", "entity_type": "lodging", "display_name": "Ritz Paris"}],
            "resolved": {"h": {"id": "h", "found": false, "provider_latency_ms": 0, "cache": "miss"}}
        });
        let response = app(false)
            .oneshot(post_json("/api/pipeline/assemble", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["segments"][1]["kind"], "lodging");
        assert_eq!(json["segments"][1]["resolved"]["found"], false);
        assert_eq!(json["segments"][2]["content"], ".");
    }
}
