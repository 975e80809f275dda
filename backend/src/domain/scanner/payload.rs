//! QR payload parsing.
//!
//! Certificates carry a QR code of the form `PREFIX:IDENTIFIER`, normally
//! `CERTIFICATE:KTM-2023-12345`. Only the first colon separates the prefix,
//! so identifiers may themselves contain colons.

use std::fmt;

use crate::domain::{CertificateNumber, CertificateNumberError};

/// Why a scanned payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPayloadError {
    Empty,
    MissingSeparator,
    MissingIdentifier,
    InvalidIdentifier(CertificateNumberError),
}

impl fmt::Display for ScanPayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "payload is empty"),
            Self::MissingSeparator => write!(f, "payload has no prefix separator"),
            Self::MissingIdentifier => write!(f, "payload has no identifier"),
            Self::InvalidIdentifier(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ScanPayloadError {}

/// Extract the certificate number from a scanned payload.
///
/// # Examples
/// ```
/// use certverify::domain::scanner::parse_scan_payload;
///
/// let number = parse_scan_payload("CERTIFICATE:ABC-123").expect("valid payload");
/// assert_eq!(number.as_ref(), "ABC-123");
/// assert!(parse_scan_payload("CERTIFICATE:").is_err());
/// ```
pub fn parse_scan_payload(raw: &str) -> Result<CertificateNumber, ScanPayloadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScanPayloadError::Empty);
    }
    let Some((_, identifier)) = trimmed.split_once(':') else {
        return Err(ScanPayloadError::MissingSeparator);
    };
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ScanPayloadError::MissingIdentifier);
    }
    CertificateNumber::new(identifier).map_err(ScanPayloadError::InvalidIdentifier)
}
