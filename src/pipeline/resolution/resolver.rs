use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;

use super::{LookupCache, LookupKey, LookupOutcome, LookupResult, ProviderRegistry};
use crate::models::{CacheStatus, EntityDescriptor, ResolvedMap, ResolvedRecord};

/// Default cap on concurrent provider calls per resolve.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;
/// Default per-lookup timeout.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    pub max_in_flight: usize,
    pub lookup_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

/// Aggregate counts for one resolve call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    /// Unique ids requested.
    pub requested: usize,
    pub found: usize,
    /// Provider answered with no match.
    pub not_found: usize,
    /// Provider error, timeout, or no provider for the type.
    pub failed: usize,
    pub cache_hits: usize,
}

impl ResolutionSummary {
    pub fn from_records(records: &ResolvedMap) -> Self {
        let mut summary = Self {
            requested: records.len(),
            ..Self::default()
        };
        for record in records.values() {
            match (record.found, record.error.is_some()) {
                (true, _) => summary.found += 1,
                (false, false) => summary.not_found += 1,
                (false, true) => summary.failed += 1,
            }
            if record.cache == CacheStatus::Hit {
                summary.cache_hits += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub records: ResolvedMap,
    pub summary: ResolutionSummary,
}

/// Turns entity descriptors into resolution records through the registered
/// providers, sharing one lookup cache across every request.
#[derive(Clone)]
pub struct EntityResolver {
    registry: ProviderRegistry,
    cache: Arc<LookupCache>,
    config: ResolverConfig,
}

impl EntityResolver {
    pub fn new(registry: ProviderRegistry, cache: Arc<LookupCache>, config: ResolverConfig) -> Self {
        Self {
            registry,
            cache,
            config,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<LookupCache> {
        &self.cache
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve every unique id in `descriptors`. Never fails: each id gets
    /// exactly one record, with `found: false` when its lookup did not
    /// succeed.
    pub async fn resolve(&self, descriptors: &[EntityDescriptor]) -> ResolvedMap {
        let unique: Vec<EntityDescriptor> = dedup_by_id(descriptors).into_iter().cloned().collect();
        let max_in_flight = self.config.max_in_flight.max(1);

        // Owned futures keep the stream 'static, so handler futures stay Send.
        stream::iter(unique)
            .map(|descriptor| {
                let resolver = self.clone();
                async move { resolver.resolve_one(&descriptor).await }
            })
            .buffer_unordered(max_in_flight)
            .map(|record| (record.id.clone(), record))
            .collect()
            .await
    }

    /// Same as [`resolve`](Self::resolve), plus aggregate counts.
    pub async fn resolve_detailed(&self, descriptors: &[EntityDescriptor]) -> Resolution {
        let records = self.resolve(descriptors).await;
        let summary = ResolutionSummary::from_records(&records);
        tracing::info!(
            requested = summary.requested,
            found = summary.found,
            not_found = summary.not_found,
            failed = summary.failed,
            cache_hits = summary.cache_hits,
            "Resolution complete"
        );
        Resolution { records, summary }
    }

    async fn resolve_one(&self, descriptor: &EntityDescriptor) -> ResolvedRecord {
        let entity_type = descriptor.entity_type();
        let Some(provider) = self.registry.get(entity_type) else {
            tracing::warn!(id = %descriptor.id, %entity_type, "No provider registered");
            return ResolvedRecord::not_found(
                descriptor.id.clone(),
                Some(format!("no provider registered for {entity_type}")),
                0,
                CacheStatus::Miss,
            );
        };

        let key = LookupKey::for_descriptor(descriptor);
        let timeout = self.config.lookup_timeout;
        let owned = descriptor.clone();

        let (done, cache) = self
            .cache
            .get_or_lookup(key, move || async move {
                match tokio::time::timeout(timeout, provider.lookup(&owned)).await {
                    Ok(Ok(LookupResult::Found(payload))) if payload.entity_type() == entity_type => {
                        LookupOutcome::Found(payload)
                    }
                    Ok(Ok(LookupResult::Found(payload))) => LookupOutcome::Failed(format!(
                        "{} returned a {} payload for a {entity_type} entity",
                        provider.name(),
                        payload.entity_type()
                    )),
                    Ok(Ok(LookupResult::NotFound)) => LookupOutcome::NotFound,
                    Ok(Err(e)) => LookupOutcome::Failed(e.to_string()),
                    Err(_) => LookupOutcome::Failed(format!(
                        "lookup timed out after {}ms",
                        timeout.as_millis()
                    )),
                }
            })
            .await;

        let id = descriptor.id.clone();
        match done.outcome {
            LookupOutcome::Found(payload) => {
                ResolvedRecord::found(id, payload, done.latency_ms, cache)
            }
            LookupOutcome::NotFound => {
                tracing::debug!(%id, %entity_type, "No match from provider");
                ResolvedRecord::not_found(id, None, done.latency_ms, cache)
            }
            LookupOutcome::Failed(error) => {
                tracing::warn!(%id, %entity_type, %error, "Lookup failed");
                ResolvedRecord::not_found(id, Some(error), done.latency_ms, cache)
            }
        }
    }
}

/// First descriptor for each id wins; order of first appearance is kept.
fn dedup_by_id(descriptors: &[EntityDescriptor]) -> Vec<&EntityDescriptor> {
    let mut seen = HashSet::new();
    descriptors
        .iter()
        .filter(|d| {
            let first = seen.insert(d.id.as_str());
            if !first {
                tracing::debug!(id = %d.id, "Ignoring duplicate descriptor id");
            }
            first
        })
        .collect()
}
