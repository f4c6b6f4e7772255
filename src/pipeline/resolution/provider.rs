use async_trait::async_trait;

use super::ProviderError;
use crate::models::{EntityDescriptor, ResolvedPayload};

/// Answer from a provider that completed its call.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Found(ResolvedPayload),
    NotFound,
}

/// External lookup service for one entity type.
///
/// Implementations must return a payload whose variant matches the
/// descriptor's entity type; the resolver treats anything else as a failure.
#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn lookup(&self, descriptor: &EntityDescriptor) -> Result<LookupResult, ProviderError>;
}
