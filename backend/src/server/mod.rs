//! Server construction and middleware wiring.

mod config;

pub use config::{AppSettings, RecordSource, ServerConfig};

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use certverify::Trace;
#[cfg(debug_assertions)]
use certverify::doc::ApiDoc;
use certverify::domain::CertificateVerificationService;
use certverify::domain::ports::{CertificateRecordStore, CertificateVerification};
use certverify::inbound::http::certificates::{verify_certificate, verify_scanned_certificate};
use certverify::inbound::http::health::{HealthState, live, ready};
use certverify::inbound::http::state::HttpState;
use certverify::outbound::records::{HttpCertificateRecordStore, InMemoryCertificateRecordStore};

/// Build the record store selected by the configuration.
///
/// # Errors
///
/// Fails when the fixture cannot be loaded or the HTTP client cannot be built.
pub fn build_record_store(source: &RecordSource) -> Result<Arc<dyn CertificateRecordStore>> {
    match source {
        RecordSource::Fixture(path) => {
            let store = InMemoryCertificateRecordStore::from_path(path)
                .wrap_err_with(|| format!("loading record fixture {}", path.display()))?;
            info!(path = %path.display(), records = store.len(), "serving records from fixture");
            Ok(Arc::new(store))
        }
        RecordSource::Registry { api_base, timeout } => {
            let store = HttpCertificateRecordStore::new(api_base.clone(), *timeout)
                .wrap_err("building registry HTTP client")?;
            info!(api_base = %api_base, timeout_ms = timeout.as_millis(), "serving records from registry");
            Ok(Arc::new(store))
        }
    }
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1")
        .service(verify_certificate)
        .service(verify_scanned_certificate);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server and flip readiness once it is bound.
///
/// # Errors
///
/// Fails when the record store cannot be built or the socket cannot be bound.
pub fn create_server(health_state: web::Data<HealthState>, config: &ServerConfig) -> Result<Server> {
    let store = build_record_store(config.records())?;
    let verification: Arc<dyn CertificateVerification> =
        Arc::new(CertificateVerificationService::new(store));
    let http_state = web::Data::new(HttpState::new(verification));
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || build_app(server_health_state.clone(), http_state.clone()))
        .bind(config.bind_addr())
        .wrap_err_with(|| format!("binding {}", config.bind_addr()))?
        .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;

    fn fixture_state() -> web::Data<HttpState> {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"[{"certificateNo": "KTM-2023-12345", "status": "approved",
                  "childFullName": "Aarav Sharma", "dateOfBirth": "2023-05-15"}]"#,
        )
        .expect("write fixture");
        let store = build_record_store(&RecordSource::Fixture(file.path().to_path_buf()))
            .expect("fixture store");
        web::Data::new(HttpState::new(Arc::new(CertificateVerificationService::new(
            store,
        ))))
    }

    #[rstest]
    #[actix_web::test]
    async fn wires_probes_and_verification_behind_trace() {
        let health = web::Data::new(HealthState::new());
        health.mark_ready();
        let app = actix_test::init_service(build_app(health, fixture_state())).await;

        let probe = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/health/ready").to_request(),
        )
        .await;
        assert_eq!(probe.status(), StatusCode::OK);
        assert!(probe.headers().contains_key("trace-id"));

        let request = actix_test::TestRequest::post()
            .uri("/api/v1/certificates/scan")
            .set_json(json!({"payload": "CERTIFICATE:KTM-2023-12345"}))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["kind"], "verified");
    }

    #[rstest]
    fn missing_fixture_fails_startup() {
        let error = build_record_store(&RecordSource::Fixture("/nonexistent/records.json".into()))
            .err()
            .expect("missing fixture must fail");
        assert!(error.to_string().contains("loading record fixture"), "{error}");
    }
}
