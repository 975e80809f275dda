//! Certificate verification HTTP handlers.
//!
//! ```text
//! POST /api/v1/certificates/verify
//! POST /api/v1/certificates/scan
//! ```
//!
//! Both endpoints answer with a [`VerificationOutcome`]. A missing or
//! unapproved certificate is a successful response; only malformed input is
//! rejected with `400`.

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::domain::scanner::{ScanPayloadError, parse_scan_payload};
use crate::domain::{Error, VerificationOutcome, VerificationQuery, VerificationQueryError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Manual verification form.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCertificateRequest {
    #[schema(example = "Sharma")]
    pub last_name: String,
    #[schema(example = "KTM-2023-12345")]
    pub certificate_number: String,
    #[schema(format = Date, example = "2023-05-15")]
    pub date_of_birth: String,
}

/// Raw text decoded from a certificate's QR code.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayloadRequest {
    #[schema(example = "CERTIFICATE:KTM-2023-12345")]
    pub payload: String,
}

fn map_query_error(err: &VerificationQueryError) -> Error {
    let details = match err {
        VerificationQueryError::MissingFields { fields } => json!({
            "fields": fields,
            "code": "missing_fields",
        }),
        VerificationQueryError::InvalidDateOfBirth { value } => json!({
            "field": "dateOfBirth",
            "value": value,
            "code": "invalid_date",
        }),
    };
    Error::invalid_request(err.to_string()).with_details(details)
}

fn map_payload_error(err: &ScanPayloadError) -> Error {
    let code = match err {
        ScanPayloadError::Empty => "empty_payload",
        ScanPayloadError::MissingSeparator => "missing_separator",
        ScanPayloadError::MissingIdentifier => "missing_identifier",
        ScanPayloadError::InvalidIdentifier(_) => "invalid_certificate_number",
    };
    Error::invalid_request(format!("invalid QR payload: {err}")).with_details(json!({
        "field": "payload",
        "code": code,
    }))
}

/// Verify a certificate from the manual entry form.
///
/// Exact lookup by certificate number first, then a fuzzy search on family
/// name and date of birth.
#[utoipa::path(
    post,
    path = "/api/v1/certificates/verify",
    request_body = VerifyCertificateRequest,
    responses(
        (status = 200, description = "Verification outcome", body = VerificationOutcome),
        (status = 400, description = "Invalid form", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["certificates"],
    operation_id = "verifyCertificate"
)]
#[post("/certificates/verify")]
pub async fn verify_certificate(
    state: web::Data<HttpState>,
    payload: web::Json<VerifyCertificateRequest>,
) -> ApiResult<web::Json<VerificationOutcome>> {
    let form = payload.into_inner();
    let query = VerificationQuery::try_from_form(
        &form.last_name,
        &form.certificate_number,
        &form.date_of_birth,
    )
    .map_err(|err| map_query_error(&err))?;
    let outcome = state.verification.verify(&query).await;
    info!(kind = outcome.kind(), "manual verification answered");
    Ok(web::Json(outcome))
}

/// Verify a certificate from a scanned QR payload.
///
/// Scanned identifiers are authoritative, so only the exact lookup runs.
#[utoipa::path(
    post,
    path = "/api/v1/certificates/scan",
    request_body = ScanPayloadRequest,
    responses(
        (status = 200, description = "Verification outcome", body = VerificationOutcome),
        (status = 400, description = "Malformed payload", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["certificates"],
    operation_id = "verifyScannedCertificate"
)]
#[post("/certificates/scan")]
pub async fn verify_scanned_certificate(
    state: web::Data<HttpState>,
    payload: web::Json<ScanPayloadRequest>,
) -> ApiResult<web::Json<VerificationOutcome>> {
    let number = parse_scan_payload(&payload.payload).map_err(|err| map_payload_error(&err))?;
    let outcome = state.verification.verify_identifier(&number).await;
    info!(kind = outcome.kind(), certificate = %number, "scanned verification answered");
    Ok(web::Json(outcome))
}

#[cfg(test)]
#[path = "certificates_tests.rs"]
mod tests;
