pub mod cache;
pub mod key;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod resolver;

pub use cache::*;
pub use key::*;
pub use provider::*;
pub use registry::*;
pub use resolver::*;

use thiserror::Error;

/// Transport or service failure inside a lookup provider. "No result" is
/// never an error: providers return `LookupResult::NotFound` for that.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Provider returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Provider rejected request: {0}")]
    Rejected(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}
