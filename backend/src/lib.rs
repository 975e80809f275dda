//! Birth certificate verification library.
//!
//! The domain resolves manual and scanned verification requests against a
//! registry of birth records and drives the camera scanning session. The
//! outbound adapters reach the registry; the inbound adapter exposes the
//! resolver over HTTP.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
pub use middleware::trace::TraceId;
