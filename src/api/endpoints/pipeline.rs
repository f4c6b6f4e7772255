//! Pipeline endpoints.
//!
//! - `POST /api/pipeline/run`: generate, resolve and assemble
//! - `POST /api/pipeline/segments`: resolve and assemble supplied generator output
//! - `POST /api/pipeline/resolve`: resolution only
//! - `POST /api/pipeline/assemble`: assembly only, no I/O

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{EntityDescriptor, ResolvedMap};
use crate::pipeline::assembly::Assembly;
use crate::pipeline::generation::{GenerationRequest, GenerationResponse, TripContext};
use crate::pipeline::resolution::Resolution;
use crate::pipeline::PipelineOutput;

const MAX_QUERY_CHARS: usize = 2000;

#[derive(Deserialize)]
pub struct RunRequest {
    pub query: String,
    #[serde(default)]
    pub context: Option<TripContext>,
}

/// Entity lists are taken item by item; malformed items are dropped.
#[derive(Deserialize)]
pub struct SegmentsRequest {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<Value>,
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub entities: Vec<Value>,
}

#[derive(Deserialize)]
pub struct AssembleRequest {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<Value>,
    #[serde(default)]
    pub resolved: ResolvedMap,
}

/// `POST /api/pipeline/run`
pub async fn run(
    State(ctx): State<ApiContext>,
    Json(req): Json<RunRequest>,
) -> Result<Json<PipelineOutput>, ApiError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query cannot be empty".into()));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Query too long (max {MAX_QUERY_CHARS} chars)"
        )));
    }

    let request = GenerationRequest {
        query: query.to_string(),
        context: req.context.filter(|c| !c.is_empty()),
    };
    let output = ctx.pipeline.run(&request).await?;
    Ok(Json(output))
}

/// `POST /api/pipeline/segments`
pub async fn segments(
    State(ctx): State<ApiContext>,
    Json(req): Json<SegmentsRequest>,
) -> Result<Json<PipelineOutput>, ApiError> {
    let response = GenerationResponse {
        text: req.text,
        entities: descriptors_from(req.entities),
    };
    let output = ctx.pipeline.run_from_generation(response).await?;
    Ok(Json(output))
}

/// `POST /api/pipeline/resolve`
pub async fn resolve(
    State(ctx): State<ApiContext>,
    Json(req): Json<ResolveRequest>,
) -> Json<Resolution> {
    let descriptors = descriptors_from(req.entities);
    Json(ctx.pipeline.resolve(&descriptors).await)
}

/// `POST /api/pipeline/assemble`
pub async fn assemble(
    State(ctx): State<ApiContext>,
    Json(req): Json<AssembleRequest>,
) -> Result<Json<Assembly>, ApiError> {
    let descriptors = descriptors_from(req.entities);
    let assembly = ctx.pipeline.assemble(&req.text, &descriptors, &req.resolved)?;
    Ok(Json(assembly))
}

fn descriptors_from(values: Vec<Value>) -> Vec<EntityDescriptor> {
    let total = values.len();
    let descriptors: Vec<EntityDescriptor> = values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if descriptors.len() < total {
        tracing::warn!(
            skipped = total - descriptors.len(),
            "Dropped malformed entity descriptors"
        );
    }
    descriptors
}
