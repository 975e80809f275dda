//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the certificate verification endpoints, the health
//! probes, and the payload schemas they exchange. Swagger UI serves it in
//! debug builds.

use utoipa::OpenApi;

use crate::domain::{
    CertificateDetails, CertificateStatus, Error, ErrorCode, VerificationOutcome,
    VerifiedCertificate,
};
use crate::inbound::http::certificates::{ScanPayloadRequest, VerifyCertificateRequest};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Birth certificate verification API",
        description = "Public verification of registered birth certificates by form entry or QR scan."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::certificates::verify_certificate,
        crate::inbound::http::certificates::verify_scanned_certificate,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        VerifyCertificateRequest,
        ScanPayloadRequest,
        VerificationOutcome,
        VerifiedCertificate,
        CertificateDetails,
        CertificateStatus,
        Error,
        ErrorCode
    )),
    tags(
        (name = "certificates", description = "Certificate verification"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
