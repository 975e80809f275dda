//! Driving port used by inbound adapters and the scan session to verify
//! certificates.

use async_trait::async_trait;

use crate::domain::{CertificateNumber, VerificationOutcome, VerificationQuery};

/// Verify certificates on behalf of a member of the public.
///
/// Implementations never fail: registry problems surface as
/// [`VerificationOutcome::Error`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateVerification: Send + Sync {
    /// Manual entry: exact lookup with a fuzzy fallback.
    async fn verify(&self, query: &VerificationQuery) -> VerificationOutcome;

    /// Scanned identifier: exact lookup only.
    async fn verify_identifier(&self, certificate_number: &CertificateNumber)
    -> VerificationOutcome;
}
