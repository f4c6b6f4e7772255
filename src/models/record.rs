use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::payload::ResolvedPayload;

/// Resolution results keyed by descriptor id.
pub type ResolvedMap = HashMap<String, ResolvedRecord>;

/// How the lookup cache answered for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// This request issued the provider call.
    Miss,
    /// A completed entry within its TTL answered.
    Hit,
    /// Joined a provider call another request had in flight.
    Shared,
}

/// Outcome of resolving one entity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    pub id: String,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResolvedPayload>,
    /// Diagnostic only.
    pub provider_latency_ms: u64,
    /// Why the entity was not found (provider error, timeout, no match).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cache: CacheStatus,
}

impl ResolvedRecord {
    pub fn found(
        id: impl Into<String>,
        payload: ResolvedPayload,
        provider_latency_ms: u64,
        cache: CacheStatus,
    ) -> Self {
        Self {
            id: id.into(),
            found: true,
            payload: Some(payload),
            provider_latency_ms,
            error: None,
            cache,
        }
    }

    pub fn not_found(
        id: impl Into<String>,
        reason: Option<String>,
        provider_latency_ms: u64,
        cache: CacheStatus,
    ) -> Self {
        Self {
            id: id.into(),
            found: false,
            payload: None,
            provider_latency_ms,
            error: reason,
            cache,
        }
    }
}
