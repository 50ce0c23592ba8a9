//! Shared service plumbing for the Brännbollsarkivet backend.
//!
//! Health probe handlers, tracing setup and the request-id layer used by
//! every service router.

pub mod health;
pub mod middleware;
pub mod tracing;
