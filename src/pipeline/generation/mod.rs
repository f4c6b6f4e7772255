pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

pub use openai::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

/// Failure of the upstream generation step. Always fatal for the request.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No content generator configured")]
    NotConfigured,

    #[error("Generation service unreachable: {0}")]
    Connection(String),

    #[error("Generation request timed out after {0}s")]
    Timeout(u64),

    #[error("Generation service returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Generation service returned an empty completion")]
    EmptyCompletion,

    #[error("Malformed generation output: {0}")]
    MalformedOutput(String),

    #[error("Generation output has no text")]
    MissingText,
}
