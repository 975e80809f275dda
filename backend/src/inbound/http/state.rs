//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on the driving port and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::CertificateVerification;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub verification: Arc<dyn CertificateVerification>,
}

impl HttpState {
    pub fn new(verification: Arc<dyn CertificateVerification>) -> Self {
        Self { verification }
    }
}
