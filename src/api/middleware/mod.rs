//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. CORS: answers preflight requests
//! 2. Access log: method, path, status and latency for every request

pub mod access_log;
