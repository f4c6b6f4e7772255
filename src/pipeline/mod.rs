pub mod assembly;
pub mod generation;
pub mod markup;
pub mod orchestrator; // generate → (scan ∥ resolve) → assemble
pub mod resolution;

pub use orchestrator::{
    Phase, PhaseLog, PhaseTimings, PhaseTransition, Pipeline, PipelineError, PipelineFailure,
    PipelineOutput,
};
