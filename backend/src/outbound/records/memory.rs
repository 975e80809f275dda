//! In-memory record store seeded from a JSON fixture.
//!
//! Used for local runs without a registry backend and by the HTTP and
//! behaviour tests. Rows use the same shapes the registry API returns.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::dto::{RecordMap, record_from_map};
use crate::domain::ports::{CertificateRecordStore, CertificateStoreError};
use crate::domain::{
    CertificateNumber, CertificateRecord, MatchCandidate, MatchingPolicy, rank_candidates,
};

/// Record store holding every record in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCertificateRecordStore {
    records: HashMap<CertificateNumber, CertificateRecord>,
    policy: MatchingPolicy,
}

impl InMemoryCertificateRecordStore {
    /// Later records replace earlier ones carrying the same number.
    pub fn new(records: impl IntoIterator<Item = CertificateRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.certificate_number().clone(), record))
                .collect(),
            policy: MatchingPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MatchingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Parse a JSON array of registry rows.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateStoreError::Decode`] when the payload is not an
    /// array of objects or a row carries no usable certificate number.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CertificateStoreError> {
        let rows: Vec<RecordMap> = serde_json::from_slice(bytes).map_err(|error| {
            CertificateStoreError::decode(format!("invalid record fixture: {error}"))
        })?;
        let records = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                record_from_map(row).map_err(|reason| {
                    CertificateStoreError::decode(format!("fixture row {index}: {reason}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(records))
    }

    /// Read and parse a JSON fixture file.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateStoreError::Connection`] when the file cannot be
    /// read, otherwise the errors of [`Self::from_json`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CertificateStoreError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|error| {
            CertificateStoreError::connection(format!("reading {}: {error}", path.display()))
        })?;
        Self::from_json(&bytes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CertificateRecordStore for InMemoryCertificateRecordStore {
    async fn lookup_by_id(
        &self,
        certificate_number: &CertificateNumber,
    ) -> Result<Option<CertificateRecord>, CertificateStoreError> {
        Ok(self.records.get(certificate_number).cloned())
    }

    async fn fuzzy_search(
        &self,
        last_name: &str,
        date_of_birth: NaiveDate,
    ) -> Result<Vec<MatchCandidate>, CertificateStoreError> {
        Ok(rank_candidates(
            self.records.values().map(CertificateRecord::summary),
            last_name,
            date_of_birth,
            &self.policy,
        ))
    }
}
