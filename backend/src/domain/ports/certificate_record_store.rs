//! Port for reading birth registration records.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{CertificateNumber, CertificateRecord, MatchCandidate};

use super::define_port_error;

define_port_error! {
    /// Errors raised by certificate record store adapters.
    pub enum CertificateStoreError {
        /// The store could not be reached.
        Connection { message: String } =>
            "certificate store connection failed: {message}",
        /// The store answered but refused or failed the request.
        Query { message: String } =>
            "certificate store query failed: {message}",
        /// The store answered with a payload that could not be read.
        Decode { message: String } =>
            "certificate store returned an unreadable payload: {message}",
    }
}

/// Read-only access to the registry.
///
/// `fuzzy_search` may return candidates in any order; callers pick the
/// highest score themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateRecordStore: Send + Sync {
    /// Exact lookup by certificate number.
    async fn lookup_by_id(
        &self,
        certificate_number: &CertificateNumber,
    ) -> Result<Option<CertificateRecord>, CertificateStoreError>;

    /// Candidates resembling the given family name and date of birth.
    async fn fuzzy_search(
        &self,
        last_name: &str,
        date_of_birth: NaiveDate,
    ) -> Result<Vec<MatchCandidate>, CertificateStoreError>;
}
