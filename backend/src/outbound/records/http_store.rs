//! Reqwest-backed registry adapter.
//!
//! This adapter owns transport details only: URL construction, timeout and
//! HTTP error mapping, and JSON decoding into domain records. The registry
//! has no search endpoint, so candidates are ranked locally from the full
//! listing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{RecordEnvelopeDto, RecordListDto};
use crate::domain::ports::{CertificateRecordStore, CertificateStoreError};
use crate::domain::{
    CertificateNumber, CertificateRecord, MatchCandidate, MatchingPolicy, rank_candidates,
};

const RECORD_SEGMENTS: [&str; 2] = ["api", "birth-record"];
const LISTING_SEGMENTS: [&str; 2] = ["api", "birth-records"];

/// Record store reading from the registry's JSON API.
pub struct HttpCertificateRecordStore {
    client: Client,
    base: Url,
    policy: MatchingPolicy,
}

impl HttpCertificateRecordStore {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            policy: MatchingPolicy::default(),
        })
    }

    /// Replace the ranking policy applied to fuzzy search results.
    #[must_use]
    pub fn with_policy(mut self, policy: MatchingPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CertificateStoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                CertificateStoreError::query(format!("base URL {} cannot carry a path", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<(StatusCode, Vec<u8>), CertificateStoreError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl CertificateRecordStore for HttpCertificateRecordStore {
    async fn lookup_by_id(
        &self,
        certificate_number: &CertificateNumber,
    ) -> Result<Option<CertificateRecord>, CertificateStoreError> {
        let segments: Vec<&str> = RECORD_SEGMENTS
            .into_iter()
            .chain([certificate_number.as_ref()])
            .collect();
        let (status, body) = self.get(self.endpoint(&segments)?).await?;
        if status == StatusCode::NOT_FOUND {
            debug!(certificate = %certificate_number, "registry reported no record");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        decode::<RecordEnvelopeDto>(&body)?
            .into_record()
            .map_err(CertificateStoreError::decode)
    }

    async fn fuzzy_search(
        &self,
        last_name: &str,
        date_of_birth: NaiveDate,
    ) -> Result<Vec<MatchCandidate>, CertificateStoreError> {
        let (status, body) = self.get(self.endpoint(&LISTING_SEGMENTS)?).await?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        let summaries = decode::<RecordListDto>(&body)?
            .into_summaries()
            .map_err(CertificateStoreError::query)?;
        let scanned = summaries.len();
        let candidates = rank_candidates(summaries, last_name, date_of_birth, &self.policy);
        debug!(scanned, kept = candidates.len(), "ranked registry listing");
        Ok(candidates)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, CertificateStoreError> {
    serde_json::from_slice(body).map_err(|error| {
        CertificateStoreError::decode(format!("invalid registry JSON payload: {error}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> CertificateStoreError {
    CertificateStoreError::connection(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> CertificateStoreError {
    let preview = body_preview(body);
    if preview.is_empty() {
        CertificateStoreError::query(format!("status {}", status.as_u16()))
    } else {
        CertificateStoreError::query(format!("status {}: {preview}", status.as_u16()))
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
