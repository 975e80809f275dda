//! Birth certificate records as held by the registry.
//!
//! Records are owned by the external record store and are only ever read by
//! this crate. Demographic detail lives in [`CertificateDetails`]; the only
//! way to move it out of a [`CertificateRecord`] is by consuming the record,
//! which keeps disclosure decisions in one place (see
//! [`crate::domain::VerificationOutcome::from_record`]).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum accepted length of a certificate number.
pub const CERTIFICATE_NUMBER_MAX: usize = 64;

/// Validation errors returned by [`CertificateNumber::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateNumberError {
    Empty,
    ContainsWhitespace,
    TooLong { max: usize },
}

impl fmt::Display for CertificateNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "certificate number must not be empty"),
            Self::ContainsWhitespace => {
                write!(f, "certificate number must not contain whitespace")
            }
            Self::TooLong { max } => {
                write!(f, "certificate number must be at most {max} characters")
            }
        }
    }
}

impl std::error::Error for CertificateNumberError {}

/// Canonical certificate identifier, e.g. `KTM-2023-12345`.
///
/// Surrounding whitespace is trimmed on construction; the remaining text is
/// compared exactly.
///
/// # Examples
/// ```
/// use certverify::domain::CertificateNumber;
///
/// let number = CertificateNumber::new("  KTM-2023-12345 ").expect("valid number");
/// assert_eq!(number.as_ref(), "KTM-2023-12345");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CertificateNumber(String);

impl CertificateNumber {
    /// Validate and construct a [`CertificateNumber`].
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CertificateNumberError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CertificateNumberError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(CertificateNumberError::ContainsWhitespace);
        }
        if trimmed.chars().count() > CERTIFICATE_NUMBER_MAX {
            return Err(CertificateNumberError::TooLong {
                max: CERTIFICATE_NUMBER_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for CertificateNumber {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CertificateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CertificateNumber> for String {
    fn from(value: CertificateNumber) -> Self {
        value.0
    }
}

impl TryFrom<String> for CertificateNumber {
    type Error = CertificateNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Review status of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    /// Submitted and awaiting review. Also used for absent or unknown labels.
    Pending,
    /// Approved by the registrar; the certificate is valid.
    Approved,
    /// Reviewed and refused.
    Rejected,
}

impl CertificateStatus {
    /// Interpret a status label from the record store.
    ///
    /// Matching is case-insensitive. `approved` and `verified` both mean the
    /// certificate is valid; anything unrecognised is treated as pending.
    ///
    /// # Examples
    /// ```
    /// use certverify::domain::CertificateStatus;
    ///
    /// assert_eq!(CertificateStatus::from_label(Some("Verified")), CertificateStatus::Approved);
    /// assert_eq!(CertificateStatus::from_label(Some("REJECTED")), CertificateStatus::Rejected);
    /// assert_eq!(CertificateStatus::from_label(Some("in review")), CertificateStatus::Pending);
    /// assert_eq!(CertificateStatus::from_label(None), CertificateStatus::Pending);
    /// ```
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::Pending;
        };
        let normalised = label.trim().to_ascii_lowercase();
        match normalised.as_str() {
            "approved" | "verified" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }

    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Demographic content of a birth registration.
///
/// This is personal data: it may only leave the crate inside a verified
/// outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDetails {
    #[schema(example = "Arjun Kumar Sharma")]
    pub child_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Date, example = "2023-05-15")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_municipality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_ward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permanent_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Date)]
    pub registration_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Date)]
    pub issued_date: Option<NaiveDate>,
}

/// Input for [`CertificateRecord::new`].
#[derive(Debug, Clone)]
pub struct CertificateRecordDraft {
    pub certificate_number: CertificateNumber,
    pub status: CertificateStatus,
    pub reject_reason: Option<String>,
    /// Surname the registry indexes the record under.
    pub family_name: String,
    pub details: CertificateDetails,
}

/// Full registry record, as returned by a direct lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    certificate_number: CertificateNumber,
    status: CertificateStatus,
    reject_reason: Option<String>,
    family_name: String,
    details: CertificateDetails,
}

impl CertificateRecord {
    /// Build a record from its parts.
    ///
    /// A blank reject reason is dropped so callers can rely on `Some` meaning
    /// "there is something to show".
    #[must_use]
    pub fn new(draft: CertificateRecordDraft) -> Self {
        let reject_reason = draft
            .reject_reason
            .map(|reason| reason.trim().to_owned())
            .filter(|reason| !reason.is_empty());
        Self {
            certificate_number: draft.certificate_number,
            status: draft.status,
            reject_reason,
            family_name: draft.family_name.trim().to_owned(),
            details: draft.details,
        }
    }

    #[must_use]
    pub fn certificate_number(&self) -> &CertificateNumber {
        &self.certificate_number
    }

    #[must_use]
    pub fn status(&self) -> CertificateStatus {
        self.status
    }

    #[must_use]
    pub fn reject_reason(&self) -> Option<&str> {
        self.reject_reason.as_deref()
    }

    #[must_use]
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Summary fields carried by the registry's search index.
    #[must_use]
    pub fn summary(&self) -> CertificateSummary {
        CertificateSummary {
            certificate_number: self.certificate_number.clone(),
            family_name: self.family_name.clone(),
            date_of_birth: self.details.date_of_birth,
            registration_date: self.details.registration_date,
        }
    }

    /// Consume the record, yielding its demographic content.
    #[must_use]
    pub fn into_details(self) -> (CertificateNumber, CertificateDetails) {
        (self.certificate_number, self.details)
    }
}

/// Summary projection returned by fuzzy search. Carries no status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub certificate_number: CertificateNumber,
    pub family_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub registration_date: Option<NaiveDate>,
}

/// A fuzzy-search hit with its similarity score in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub summary: CertificateSummary,
    pub score: f64,
}
