//! Verification inputs and outcomes.
//!
//! A [`VerificationQuery`] is what a member of the public types into the
//! manual form; a [`VerificationOutcome`] is the only thing they ever get
//! back. Personal data appears in exactly one variant,
//! [`VerificationOutcome::Verified`].

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::certificate::{
    CertificateDetails, CertificateNumber, CertificateRecord, CertificateStatus,
};

/// Reason shown when a rejected record carries no reason of its own.
pub const GENERIC_REJECT_REASON: &str = "The application was reviewed and rejected";

/// Detail shown when the registry cannot be consulted.
pub const STORE_UNAVAILABLE_DETAIL: &str =
    "The certificate registry could not be reached. Please try again later.";

/// Detail shown when a fuzzy match could not be confirmed by direct lookup.
pub const MATCH_UNCONFIRMED_DETAIL: &str =
    "A matching certificate was found but its details could not be loaded. Please try again.";

/// Validation errors raised while building a [`VerificationQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationQueryError {
    /// One or more required fields were blank.
    MissingFields { fields: Vec<&'static str> },
    /// Date of birth was not a calendar date in `YYYY-MM-DD` form.
    InvalidDateOfBirth { value: String },
}

impl fmt::Display for VerificationQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFields { fields } => {
                write!(f, "missing required fields: {}", fields.join(", "))
            }
            Self::InvalidDateOfBirth { value } => {
                write!(f, "date of birth must be a valid YYYY-MM-DD date, got {value:?}")
            }
        }
    }
}

impl std::error::Error for VerificationQueryError {}

/// Manual verification request.
///
/// The number is kept as typed. It only drives the exact lookup when it is
/// also a well-formed [`CertificateNumber`]; a mistyped number such as
/// `PKR 2023 00077` still reaches the fuzzy search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationQuery {
    last_name: String,
    entered_number: String,
    certificate_number: Option<CertificateNumber>,
    date_of_birth: NaiveDate,
}

impl VerificationQuery {
    /// Build a query from already-typed parts.
    pub fn new(
        last_name: impl AsRef<str>,
        certificate_number: CertificateNumber,
        date_of_birth: NaiveDate,
    ) -> Result<Self, VerificationQueryError> {
        let last_name = last_name.as_ref().trim();
        if last_name.is_empty() {
            return Err(VerificationQueryError::MissingFields {
                fields: vec!["lastName"],
            });
        }
        Ok(Self {
            last_name: last_name.to_owned(),
            entered_number: certificate_number.to_string(),
            certificate_number: Some(certificate_number),
            date_of_birth,
        })
    }

    /// Validate raw form input.
    ///
    /// Every field is trimmed first. All blank fields are reported together
    /// so the form can highlight them in one pass. A certificate number that
    /// is not a valid identifier is accepted; see [`Self::certificate_number`].
    ///
    /// # Examples
    /// ```
    /// use certverify::domain::VerificationQuery;
    ///
    /// let query = VerificationQuery::try_from_form(" Sharma ", "KTM-2023-12345", "2023-05-15")
    ///     .expect("valid form");
    /// assert_eq!(query.last_name(), "Sharma");
    /// assert!(VerificationQuery::try_from_form("", "", "2023-05-15").is_err());
    ///
    /// let mistyped = VerificationQuery::try_from_form("Gurung", "PKR 2023 00077", "2023-04-10")
    ///     .expect("mistyped numbers still reach the fuzzy search");
    /// assert!(mistyped.certificate_number().is_none());
    /// ```
    pub fn try_from_form(
        last_name: &str,
        certificate_number: &str,
        date_of_birth: &str,
    ) -> Result<Self, VerificationQueryError> {
        let last_name = last_name.trim();
        let certificate_number = certificate_number.trim();
        let date_of_birth = date_of_birth.trim();

        let missing: Vec<&'static str> = [
            ("lastName", last_name),
            ("certificateNumber", certificate_number),
            ("dateOfBirth", date_of_birth),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect();
        if !missing.is_empty() {
            return Err(VerificationQueryError::MissingFields { fields: missing });
        }

        let dob = NaiveDate::parse_from_str(date_of_birth, "%Y-%m-%d").map_err(|_| {
            VerificationQueryError::InvalidDateOfBirth {
                value: date_of_birth.to_owned(),
            }
        })?;
        Ok(Self {
            last_name: last_name.to_owned(),
            entered_number: certificate_number.to_owned(),
            certificate_number: CertificateNumber::new(certificate_number).ok(),
            date_of_birth: dob,
        })
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// The number exactly as entered, after trimming.
    #[must_use]
    pub fn entered_number(&self) -> &str {
        &self.entered_number
    }

    /// The entered number when it is a valid identifier.
    #[must_use]
    pub fn certificate_number(&self) -> Option<&CertificateNumber> {
        self.certificate_number.as_ref()
    }

    #[must_use]
    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }
}

/// Certificate content disclosed for an approved record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCertificate {
    #[schema(value_type = String, example = "KTM-2023-12345")]
    pub certificate_no: CertificateNumber,
    #[serde(flatten)]
    pub details: CertificateDetails,
}

/// Result of one verification attempt.
///
/// Serialised with a `kind` discriminator so clients can switch on it:
///
/// ```json
/// { "kind": "rejected", "reason": "Missing father's citizenship document" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VerificationOutcome {
    /// Approved record; the only variant carrying personal data.
    Verified { certificate: VerifiedCertificate },
    /// Registration exists but is awaiting review.
    Pending,
    /// Registration was refused.
    Rejected { reason: String },
    /// Nothing matched the query.
    NotFound,
    /// The registry failed or a match could not be confirmed.
    Error { detail: String },
}

impl VerificationOutcome {
    /// Classify a looked-up record by its status.
    ///
    /// Pending and rejected records are reduced to their status; their
    /// demographic content is dropped here.
    #[must_use]
    pub fn from_record(record: CertificateRecord) -> Self {
        match record.status() {
            CertificateStatus::Approved => {
                let (certificate_no, details) = record.into_details();
                Self::Verified {
                    certificate: VerifiedCertificate {
                        certificate_no,
                        details,
                    },
                }
            }
            CertificateStatus::Pending => Self::Pending,
            CertificateStatus::Rejected => Self::Rejected {
                reason: record
                    .reject_reason()
                    .unwrap_or(GENERIC_REJECT_REASON)
                    .to_owned(),
            },
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self::Error {
            detail: detail.into(),
        }
    }

    /// Short label used in logs and metrics fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Verified { .. } => "verified",
            Self::Pending => "pending",
            Self::Rejected { .. } => "rejected",
            Self::NotFound => "not-found",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this outcome discloses certificate content.
    #[must_use]
    pub const fn discloses_details(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}
