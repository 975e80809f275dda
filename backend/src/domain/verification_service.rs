//! Certificate verification service.
//!
//! Implements [`CertificateVerification`] over a [`CertificateRecordStore`].
//! Manual queries try an exact lookup first and fall back to fuzzy search on
//! a miss or a store fault; scanned identifiers use the exact lookup only.
//! Whatever happens, callers receive a [`VerificationOutcome`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::domain::matching::top_candidate;
use crate::domain::ports::{CertificateRecordStore, CertificateVerification};
use crate::domain::verification::{MATCH_UNCONFIRMED_DETAIL, STORE_UNAVAILABLE_DETAIL};
use crate::domain::{CertificateNumber, VerificationOutcome, VerificationQuery};

/// Verification service backed by a record store.
pub struct CertificateVerificationService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for CertificateVerificationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ?Sized> CertificateVerificationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> CertificateVerificationService<S>
where
    S: CertificateRecordStore + ?Sized,
{
    /// Resolve a manual query.
    ///
    /// 1. Exact lookup by certificate number; a hit is classified directly.
    ///    A number that is not a valid identifier skips this step.
    /// 2. Otherwise fuzzy search by family name and date of birth.
    /// 3. The highest-scoring candidate is fetched by its own number and
    ///    classified. A candidate that cannot be fetched yields
    ///    [`VerificationOutcome::Error`], never a guess.
    #[instrument(skip_all, fields(certificate = %query.entered_number()))]
    pub async fn resolve(&self, query: &VerificationQuery) -> VerificationOutcome {
        if let Some(number) = query.certificate_number() {
            match self.store.lookup_by_id(number).await {
                Ok(Some(record)) => {
                    let outcome = VerificationOutcome::from_record(record);
                    info!(outcome = outcome.kind(), "resolved by exact lookup");
                    return outcome;
                }
                Ok(None) => debug!("exact lookup missed, trying fuzzy search"),
                Err(error) => warn!(%error, "exact lookup failed, trying fuzzy search"),
            }
        } else {
            debug!("entered number is not an identifier, trying fuzzy search");
        }

        let candidates = match self
            .store
            .fuzzy_search(query.last_name(), query.date_of_birth())
            .await
        {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(%error, "fuzzy search failed");
                return VerificationOutcome::error(STORE_UNAVAILABLE_DETAIL);
            }
        };

        let Some(top) = top_candidate(&candidates) else {
            info!(outcome = "not-found", "no fuzzy candidates");
            return VerificationOutcome::NotFound;
        };
        debug!(
            candidate = %top.summary.certificate_number,
            score = top.score,
            candidates = candidates.len(),
            "selected fuzzy candidate"
        );
        self.confirm_candidate(&top.summary.certificate_number).await
    }

    async fn confirm_candidate(&self, certificate_number: &CertificateNumber) -> VerificationOutcome {
        match self.store.lookup_by_id(certificate_number).await {
            Ok(Some(record)) => {
                let outcome = VerificationOutcome::from_record(record);
                info!(
                    outcome = outcome.kind(),
                    candidate = %certificate_number,
                    "resolved by fuzzy match"
                );
                outcome
            }
            Ok(None) => {
                warn!(candidate = %certificate_number, "fuzzy candidate vanished before lookup");
                VerificationOutcome::error(MATCH_UNCONFIRMED_DETAIL)
            }
            Err(error) => {
                warn!(%error, candidate = %certificate_number, "fuzzy candidate lookup failed");
                VerificationOutcome::error(MATCH_UNCONFIRMED_DETAIL)
            }
        }
    }

    /// Resolve a scanned identifier by exact lookup only.
    #[instrument(skip_all, fields(certificate = %certificate_number))]
    pub async fn resolve_identifier(
        &self,
        certificate_number: &CertificateNumber,
    ) -> VerificationOutcome {
        let outcome = match self.store.lookup_by_id(certificate_number).await {
            Ok(Some(record)) => VerificationOutcome::from_record(record),
            Ok(None) => VerificationOutcome::NotFound,
            Err(error) => {
                warn!(%error, "identifier lookup failed");
                VerificationOutcome::error(STORE_UNAVAILABLE_DETAIL)
            }
        };
        info!(outcome = outcome.kind(), "resolved scanned identifier");
        outcome
    }
}

#[async_trait]
impl<S> CertificateVerification for CertificateVerificationService<S>
where
    S: CertificateRecordStore + ?Sized,
{
    async fn verify(&self, query: &VerificationQuery) -> VerificationOutcome {
        self.resolve(query).await
    }

    async fn verify_identifier(
        &self,
        certificate_number: &CertificateNumber,
    ) -> VerificationOutcome {
        self.resolve_identifier(certificate_number).await
    }
}

#[cfg(test)]
#[path = "verification_service_tests.rs"]
mod tests;
