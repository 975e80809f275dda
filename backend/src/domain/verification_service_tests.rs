//! Tests for the certificate verification service.

use std::sync::Arc;

use chrono::NaiveDate;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{CertificateStoreError, MockCertificateRecordStore};
use crate::domain::verification::GENERIC_REJECT_REASON;
use crate::domain::{
    CertificateDetails, CertificateRecord, CertificateRecordDraft, CertificateStatus,
    CertificateSummary, MatchCandidate,
};
use crate::outbound::records::InMemoryCertificateRecordStore;

fn number(raw: &str) -> CertificateNumber {
    CertificateNumber::new(raw).expect("valid certificate number")
}

fn record(raw: &str, status: CertificateStatus, reason: Option<&str>) -> CertificateRecord {
    CertificateRecord::new(CertificateRecordDraft {
        certificate_number: number(raw),
        status,
        reject_reason: reason.map(str::to_owned),
        family_name: "Sharma".to_owned(),
        details: CertificateDetails {
            child_name: "Arjun Kumar Sharma".to_owned(),
            date_of_birth: NaiveDate::from_ymd_opt(2023, 5, 15),
            father_name: Some("Raj Kumar Sharma".to_owned()),
            mother_name: Some("Sita Sharma".to_owned()),
            birth_district: Some("Kathmandu".to_owned()),
            ..CertificateDetails::default()
        },
    })
}

fn candidate(raw: &str, score: f64) -> MatchCandidate {
    MatchCandidate {
        summary: CertificateSummary {
            certificate_number: number(raw),
            family_name: "Gurung".to_owned(),
            date_of_birth: NaiveDate::from_ymd_opt(2023, 4, 10),
            registration_date: None,
        },
        score,
    }
}

#[fixture]
fn sharma_query() -> VerificationQuery {
    VerificationQuery::try_from_form("Sharma", "KTM-2023-12345", "2023-05-15")
        .expect("valid query")
}

#[fixture]
fn gurung_query() -> VerificationQuery {
    VerificationQuery::try_from_form("Gurung", "KTM-2023-00000", "2023-04-10")
        .expect("valid query")
}

fn service(store: MockCertificateRecordStore) -> CertificateVerificationService<MockCertificateRecordStore> {
    CertificateVerificationService::new(Arc::new(store))
}

fn expect_lookup(
    store: &mut MockCertificateRecordStore,
    raw: &'static str,
    result: Result<Option<CertificateRecord>, CertificateStoreError>,
) {
    store
        .expect_lookup_by_id()
        .withf(move |id| id.as_ref() == raw)
        .times(1)
        .return_once(move |_| result);
}

#[rstest]
#[tokio::test]
async fn exact_hit_on_approved_record_skips_fuzzy_search(sharma_query: VerificationQuery) {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(
        &mut store,
        "KTM-2023-12345",
        Ok(Some(record("KTM-2023-12345", CertificateStatus::Approved, None))),
    );
    store.expect_fuzzy_search().times(0);

    let outcome = service(store).resolve(&sharma_query).await;

    let VerificationOutcome::Verified { certificate } = outcome else {
        panic!("expected verified outcome, got {outcome:?}");
    };
    assert_eq!(certificate.certificate_no.as_ref(), "KTM-2023-12345");
    assert_eq!(certificate.details.child_name, "Arjun Kumar Sharma");
    assert_eq!(certificate.details.father_name.as_deref(), Some("Raj Kumar Sharma"));
}

#[rstest]
#[case(Some("Missing father's citizenship document"), "Missing father's citizenship document")]
#[case(None, GENERIC_REJECT_REASON)]
#[tokio::test]
async fn exact_hit_on_rejected_record_reports_reason(
    sharma_query: VerificationQuery,
    #[case] reason: Option<&'static str>,
    #[case] expected: &str,
) {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(
        &mut store,
        "KTM-2023-12345",
        Ok(Some(record("KTM-2023-12345", CertificateStatus::Rejected, reason))),
    );
    store.expect_fuzzy_search().times(0);

    let outcome = service(store).resolve(&sharma_query).await;

    assert_eq!(
        outcome,
        VerificationOutcome::Rejected {
            reason: expected.to_owned()
        }
    );
}

#[rstest]
#[tokio::test]
async fn exact_miss_falls_back_to_top_fuzzy_candidate(gurung_query: VerificationQuery) {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(&mut store, "KTM-2023-00000", Ok(None));
    store
        .expect_fuzzy_search()
        .withf(|name, dob| {
            name == "Gurung" && *dob == NaiveDate::from_ymd_opt(2023, 4, 10).expect("date")
        })
        .times(1)
        .return_once(|_, _| {
            Ok(vec![
                candidate("KTM-2023-11111", 0.80),
                candidate("KTM-2023-99999", 0.92),
            ])
        });
    expect_lookup(
        &mut store,
        "KTM-2023-99999",
        Ok(Some(record("KTM-2023-99999", CertificateStatus::Pending, None))),
    );

    let outcome = service(store).resolve(&gurung_query).await;

    assert_eq!(outcome, VerificationOutcome::Pending);
}

#[rstest]
#[tokio::test]
async fn same_surname_with_another_birth_date_is_not_found(gurung_query: VerificationQuery) {
    let store = InMemoryCertificateRecordStore::from_json(
        br#"[{"certificateNo": "KTM-2019-00001", "status": "approved",
              "childFullName": "Maya Gurung", "dateOfBirth": "2019-01-01",
              "fatherName": "Hari Gurung"}]"#,
    )
    .expect("fixture parses");
    let service = CertificateVerificationService::new(Arc::new(store));

    let outcome = service.resolve(&gurung_query).await;

    assert_eq!(outcome, VerificationOutcome::NotFound);
}

#[rstest]
#[case("KTM 2023 99999")]
#[case("KTM-2023-99999-0000000000-0000000000-0000000000-0000000000-0000000000")]
#[tokio::test]
async fn unusable_number_skips_the_exact_lookup(#[case] entered: &str) {
    let query = VerificationQuery::try_from_form("Gurung", entered, "2023-04-10")
        .expect("valid query");
    let mut store = MockCertificateRecordStore::new();
    store
        .expect_fuzzy_search()
        .times(1)
        .return_once(|_, _| Ok(vec![candidate("KTM-2023-99999", 0.92)]));
    expect_lookup(
        &mut store,
        "KTM-2023-99999",
        Ok(Some(record("KTM-2023-99999", CertificateStatus::Pending, None))),
    );

    let outcome = service(store).resolve(&query).await;

    assert_eq!(outcome, VerificationOutcome::Pending);
}

#[rstest]
#[tokio::test]
async fn no_candidates_is_not_found(gurung_query: VerificationQuery) {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(&mut store, "KTM-2023-00000", Ok(None));
    store
        .expect_fuzzy_search()
        .times(1)
        .return_once(|_, _| Ok(Vec::new()));

    let outcome = service(store).resolve(&gurung_query).await;

    assert_eq!(outcome, VerificationOutcome::NotFound);
}

#[rstest]
#[tokio::test]
async fn exact_lookup_fault_still_tries_fuzzy_search(sharma_query: VerificationQuery) {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(
        &mut store,
        "KTM-2023-12345",
        Err(CertificateStoreError::connection("connection reset")),
    );
    store
        .expect_fuzzy_search()
        .times(1)
        .return_once(|_, _| Ok(vec![candidate("KTM-2023-54321", 0.97)]));
    expect_lookup(
        &mut store,
        "KTM-2023-54321",
        Ok(Some(record("KTM-2023-54321", CertificateStatus::Approved, None))),
    );

    let outcome = service(store).resolve(&sharma_query).await;

    assert!(outcome.discloses_details(), "got {outcome:?}");
}

#[rstest]
#[tokio::test]
async fn fuzzy_search_fault_is_an_error_outcome(gurung_query: VerificationQuery) {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(&mut store, "KTM-2023-00000", Ok(None));
    store
        .expect_fuzzy_search()
        .times(1)
        .return_once(|_, _| Err(CertificateStoreError::query("HTTP 502")));

    let outcome = service(store).resolve(&gurung_query).await;

    assert_eq!(outcome, VerificationOutcome::error(STORE_UNAVAILABLE_DETAIL));
}

#[rstest]
#[case(Ok(None))]
#[case(Err(CertificateStoreError::decode("truncated body")))]
#[tokio::test]
async fn unconfirmed_candidate_is_an_error_outcome(
    gurung_query: VerificationQuery,
    #[case] refetch: Result<Option<CertificateRecord>, CertificateStoreError>,
) {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(&mut store, "KTM-2023-00000", Ok(None));
    store
        .expect_fuzzy_search()
        .times(1)
        .return_once(|_, _| Ok(vec![candidate("KTM-2023-99999", 0.92)]));
    expect_lookup(&mut store, "KTM-2023-99999", refetch);

    let outcome = service(store).resolve(&gurung_query).await;

    assert_eq!(outcome, VerificationOutcome::error(MATCH_UNCONFIRMED_DETAIL));
    assert!(!outcome.discloses_details());
}

#[rstest]
#[tokio::test]
async fn scanned_identifier_never_uses_fuzzy_search() {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(&mut store, "KTM-2023-12345", Ok(None));
    store.expect_fuzzy_search().times(0);

    let outcome = service(store)
        .resolve_identifier(&number("KTM-2023-12345"))
        .await;

    assert_eq!(outcome, VerificationOutcome::NotFound);
}

#[rstest]
#[tokio::test]
async fn scanned_identifier_store_fault_is_an_error_outcome() {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(
        &mut store,
        "KTM-2023-12345",
        Err(CertificateStoreError::connection("refused")),
    );
    store.expect_fuzzy_search().times(0);

    let outcome = service(store)
        .resolve_identifier(&number("KTM-2023-12345"))
        .await;

    assert_eq!(outcome, VerificationOutcome::error(STORE_UNAVAILABLE_DETAIL));
}

#[rstest]
#[tokio::test]
async fn driving_port_delegates_to_resolver(sharma_query: VerificationQuery) {
    let mut store = MockCertificateRecordStore::new();
    expect_lookup(
        &mut store,
        "KTM-2023-12345",
        Ok(Some(record("KTM-2023-12345", CertificateStatus::Pending, None))),
    );
    let port: Arc<dyn CertificateVerification> = Arc::new(service(store));

    assert_eq!(port.verify(&sharma_query).await, VerificationOutcome::Pending);
}
