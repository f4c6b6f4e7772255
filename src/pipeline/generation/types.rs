use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::GenerationError;
use crate::models::EntityDescriptor;

/// Optional trip details that steer the generated answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripContext {
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TripContext {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub query: String,
    #[serde(default)]
    pub context: Option<TripContext>,
}

impl GenerationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context: None,
        }
    }
}

/// Annotated text plus the entities it claims to mention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<EntityDescriptor>,
}

/// First-stage answer split at its `LOOKUP_REQUIREMENTS:` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDraft {
    pub full_text: String,
    pub natural_language: String,
    pub lookup_requirements: String,
}

/// Produces annotated travel answers.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;
}
