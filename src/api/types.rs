//! Shared state for the HTTP layer.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::generation::{ContentGenerator, OpenAiGenerator};
use crate::pipeline::resolution::providers::build_registry;
use crate::pipeline::resolution::{EntityResolver, LookupCache};
use crate::pipeline::Pipeline;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes. The pipeline (and its lookup cache) is
/// shared by every request.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<Pipeline>,
}

impl ApiContext {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Wire generator, providers and cache from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let generator = config.openai.as_ref().map(|openai| {
            Arc::new(OpenAiGenerator::new(
                openai.api_key.clone(),
                &openai.base_url,
                openai.content_model.clone(),
                openai.markup_model.clone(),
                config.generation_timeout,
            )) as Arc<dyn ContentGenerator>
        });
        if generator.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, /api/pipeline/run is disabled");
        }

        let resolver = EntityResolver::new(
            build_registry(config),
            Arc::new(LookupCache::new(config.ttls)),
            config.resolver,
        );
        Self::new(Pipeline::new(generator, resolver))
    }
}
