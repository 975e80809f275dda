//! Domain types and services.
//!
//! Everything here is transport agnostic. Adapters reach the registry and
//! the camera through the traits in [`ports`]; inbound adapters call the
//! [`ports::CertificateVerification`] driving port.

pub mod certificate;
pub mod error;
pub mod matching;
pub mod ports;
pub mod scanner;
pub mod trace_id;
pub mod verification;
pub mod verification_service;

pub use self::certificate::{
    CERTIFICATE_NUMBER_MAX, CertificateDetails, CertificateNumber, CertificateNumberError,
    CertificateRecord, CertificateRecordDraft, CertificateStatus, CertificateSummary,
    MatchCandidate,
};
pub use self::error::{ApiResult, Error, ErrorCode};
pub use self::matching::{
    MatchingPolicy, name_similarity, rank_candidates, score_summary, top_candidate,
};
pub use self::trace_id::TraceId;
pub use self::verification::{
    GENERIC_REJECT_REASON, VerificationOutcome, VerificationQuery, VerificationQueryError,
    VerifiedCertificate,
};
pub use self::verification_service::CertificateVerificationService;
