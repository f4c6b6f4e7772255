//! HTTP surface.
//!
//! Exposes the pipeline and its individual phases as JSON endpoints under
//! `/api/`. `api_router()` returns a `Router` that can be mounted on any
//! axum server; `serve()` runs it for the binary.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{serve, start_server, ApiServer, ServerError};
pub use types::ApiContext;
