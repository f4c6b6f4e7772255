//! Pipeline orchestrator.
//!
//! Drives one request through generate → (scan ∥ resolve) → assemble.
//! Generation and assembly contract violations are the only request-level
//! failures; every per-entity problem degrades into the output instead.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{EntityDescriptor, MessageSegment, ResolvedMap};
use crate::pipeline::assembly::{
    assemble_with_diagnostics, normalize_whitespace, Assembly, AssemblyDiagnostics, AssemblyError,
};
use crate::pipeline::generation::{
    ContentGenerator, GenerationError, GenerationRequest, GenerationResponse,
};
use crate::pipeline::markup::scan_markers;
use crate::pipeline::resolution::{EntityResolver, Resolution, ResolutionSummary};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Generating,
    Resolving,
    Assembling,
    Done,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Generating => "generating",
            Self::Resolving => "resolving",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    pub phase: Phase,
    /// Milliseconds since the run started.
    pub at_ms: u64,
}

/// Ordered record of the phases one run went through.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseLog {
    #[serde(skip)]
    run_id: Uuid,
    #[serde(skip)]
    started: Instant,
    transitions: Vec<PhaseTransition>,
}

impl PhaseLog {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started: Instant::now(),
            transitions: Vec::with_capacity(4),
        }
    }

    fn enter(&mut self, phase: Phase) {
        let at_ms = elapsed_ms(self.started);
        tracing::info!(run_id = %self.run_id, %phase, at_ms, "Pipeline phase");
        self.transitions.push(PhaseTransition { phase, at_ms });
    }

    fn fail(&mut self, phase: Phase, source: PipelineFailure) -> PipelineError {
        tracing::warn!(run_id = %self.run_id, %phase, error = %source, "Pipeline failed");
        self.transitions.push(PhaseTransition {
            phase: Phase::Failed,
            at_ms: elapsed_ms(self.started),
        });
        PipelineError { phase, source }
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    pub fn current(&self) -> Option<Phase> {
        self.transitions.last().map(|t| t.phase)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PipelineFailure {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// Request-level failure, tagged with the phase it happened in.
#[derive(Debug, thiserror::Error)]
#[error("Pipeline failed while {phase}: {source}")]
pub struct PipelineError {
    pub phase: Phase,
    #[source]
    pub source: PipelineFailure,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseTimings {
    pub generating_ms: u64,
    pub resolving_ms: u64,
    pub assembling_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub run_id: Uuid,
    pub segments: Vec<MessageSegment>,
    pub timings: PhaseTimings,
    pub summary: ResolutionSummary,
    pub diagnostics: AssemblyDiagnostics,
    pub phases: PhaseLog,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Sequences generation, resolution and assembly for one request at a time.
/// Cheap to clone; the resolver's cache is shared between clones.
#[derive(Clone)]
pub struct Pipeline {
    generator: Option<Arc<dyn ContentGenerator>>,
    resolver: EntityResolver,
}

impl Pipeline {
    pub fn new(generator: Option<Arc<dyn ContentGenerator>>, resolver: EntityResolver) -> Self {
        Self {
            generator,
            resolver,
        }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Full run: generate, then resolve and assemble the response.
    pub async fn run(&self, request: &GenerationRequest) -> Result<PipelineOutput, PipelineError> {
        let run_id = Uuid::new_v4();
        let mut log = PhaseLog::new(run_id);

        log.enter(Phase::Generating);
        let Some(generator) = &self.generator else {
            return Err(log.fail(Phase::Generating, GenerationError::NotConfigured.into()));
        };
        let started = Instant::now();
        let response = match generator.generate(request).await {
            Ok(response) => response,
            Err(e) => return Err(log.fail(Phase::Generating, e.into())),
        };
        let generating_ms = elapsed_ms(started);
        tracing::info!(
            %run_id,
            chars = response.text.len(),
            entities = response.entities.len(),
            elapsed_ms = generating_ms,
            "Generation complete"
        );

        self.complete(run_id, log, response, generating_ms).await
    }

    /// Resolve and assemble an already generated response.
    pub async fn run_from_generation(
        &self,
        response: GenerationResponse,
    ) -> Result<PipelineOutput, PipelineError> {
        let run_id = Uuid::new_v4();
        self.complete(run_id, PhaseLog::new(run_id), response, 0).await
    }

    /// Resolution phase on its own.
    pub async fn resolve(&self, descriptors: &[EntityDescriptor]) -> Resolution {
        self.resolver.resolve_detailed(descriptors).await
    }

    /// Assembly phase on its own: scan, assemble, normalize. No I/O.
    pub fn assemble(
        &self,
        text: &str,
        descriptors: &[EntityDescriptor],
        resolved: &ResolvedMap,
    ) -> Result<Assembly, AssemblyError> {
        let occurrences = scan_markers(text);
        let assembly = assemble_with_diagnostics(text, descriptors, &occurrences, resolved)?;
        Ok(Assembly {
            segments: normalize_whitespace(assembly.segments),
            diagnostics: assembly.diagnostics,
        })
    }

    async fn complete(
        &self,
        run_id: Uuid,
        mut log: PhaseLog,
        response: GenerationResponse,
        generating_ms: u64,
    ) -> Result<PipelineOutput, PipelineError> {
        let GenerationResponse { text, entities } = response;

        log.enter(Phase::Resolving);
        let started = Instant::now();
        let (occurrences, resolution) = tokio::join!(
            async { scan_markers(&text) },
            self.resolver.resolve_detailed(&entities),
        );
        let resolving_ms = elapsed_ms(started);
        tracing::debug!(%run_id, markers = occurrences.len(), "Scan complete");

        log.enter(Phase::Assembling);
        let started = Instant::now();
        let assembly =
            match assemble_with_diagnostics(&text, &entities, &occurrences, &resolution.records) {
                Ok(assembly) => assembly,
                Err(e) => return Err(log.fail(Phase::Assembling, e.into())),
            };
        let segments = normalize_whitespace(assembly.segments);
        let assembling_ms = elapsed_ms(started);

        log.enter(Phase::Done);
        let timings = PhaseTimings {
            generating_ms,
            resolving_ms,
            assembling_ms,
            total_ms: elapsed_ms(log.started),
        };
        tracing::info!(
            %run_id,
            segments = segments.len(),
            total_ms = timings.total_ms,
            clean = assembly.diagnostics.is_clean(),
            "Pipeline complete"
        );

        Ok(PipelineOutput {
            run_id,
            segments,
            timings,
            summary: resolution.summary,
            diagnostics: assembly.diagnostics,
            phases: log,
        })
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
