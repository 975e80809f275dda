//! Behaviour tests for the QR scan session.
//!
//! The camera and detector are fakes; verification runs against an
//! in-memory registry holding one approved certificate.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use certverify::domain::CertificateVerificationService;
use certverify::domain::ports::{
    BarcodeDetectionError, BarcodeDetector, CameraAcquisitionError, CameraSource,
    DetectedBarcode, MediaStream, StreamConstraints, VideoFrame,
};
use certverify::domain::scanner::{
    DecoderCapabilities, ScanEvent, ScanFailure, ScanSession, ScannerConfig, ScannerPorts,
};
use certverify::outbound::records::InMemoryCertificateRecordStore;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

const REGISTRY: &str = r#"[{"certificateNo": "KTM-2023-12345", "status": "approved",
    "childFullName": "Aarav Sharma", "dateOfBirth": "2023-05-15"}]"#;
const EVENT_WAIT: Duration = Duration::from_secs(2);

struct FakeStream {
    tracks: AtomicUsize,
}

impl MediaStream for FakeStream {
    fn current_frame(&self) -> Option<VideoFrame> {
        (self.tracks.load(Ordering::SeqCst) > 0)
            .then(|| VideoFrame::new(1, 1, vec![0; 4]).expect("valid frame"))
    }

    fn live_track_count(&self) -> usize {
        self.tracks.load(Ordering::SeqCst)
    }

    fn stop_all_tracks(&self) {
        self.tracks.store(0, Ordering::SeqCst);
    }
}

struct FakeCamera {
    grants: bool,
    streams: Mutex<Vec<Arc<FakeStream>>>,
}

impl FakeCamera {
    fn new(grants: bool) -> Self {
        Self {
            grants,
            streams: Mutex::new(Vec::new()),
        }
    }

    fn live_tracks(&self) -> usize {
        self.streams
            .lock()
            .expect("streams lock")
            .iter()
            .map(|stream| stream.live_track_count())
            .sum()
    }
}

#[async_trait]
impl CameraSource for FakeCamera {
    fn is_supported(&self) -> bool {
        true
    }

    async fn acquire(
        &self,
        _constraints: &StreamConstraints,
    ) -> Result<Arc<dyn MediaStream>, CameraAcquisitionError> {
        if !self.grants {
            return Err(CameraAcquisitionError::permission_denied("NotAllowedError"));
        }
        let stream = Arc::new(FakeStream {
            tracks: AtomicUsize::new(1),
        });
        self.streams
            .lock()
            .expect("streams lock")
            .push(Arc::clone(&stream));
        Ok(stream)
    }

    fn attach_preview(&self, _stream: Arc<dyn MediaStream>) {}

    fn detach_preview(&self) {}
}

/// Reports nothing for `misses` frames, then `payload` forever.
struct ScriptedDetector {
    payload: Option<String>,
    misses: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl BarcodeDetector for ScriptedDetector {
    async fn detect(
        &self,
        _frame: &VideoFrame,
    ) -> Result<Vec<DetectedBarcode>, BarcodeDetectionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.payload {
            Some(payload) if call >= self.misses => Ok(vec![DetectedBarcode {
                raw_value: payload.clone(),
            }]),
            _ => Ok(Vec::new()),
        }
    }
}

struct ScannerWorld {
    runtime: tokio::runtime::Runtime,
    camera: RefCell<Option<Arc<FakeCamera>>>,
    detector: RefCell<Option<Arc<ScriptedDetector>>>,
    session: RefCell<Option<ScanSession>>,
    event: RefCell<Option<ScanEvent>>,
}

impl ScannerWorld {
    fn new() -> Self {
        Self {
            runtime: tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime builds"),
            camera: RefCell::new(None),
            detector: RefCell::new(None),
            session: RefCell::new(None),
            event: RefCell::new(None),
        }
    }

    fn camera(&self) -> Arc<FakeCamera> {
        Arc::clone(self.camera.borrow().as_ref().expect("camera configured"))
    }

    fn with_session<T>(&self, f: impl FnOnce(&ScanSession) -> T) -> T {
        let session = self.session.borrow();
        f(session.as_ref().expect("scanner started"))
    }

    fn set_detector(&self, payload: Option<String>, misses: usize) {
        *self.detector.borrow_mut() = Some(Arc::new(ScriptedDetector {
            payload,
            misses,
            calls: AtomicUsize::new(0),
        }));
    }
}

#[fixture]
fn world() -> ScannerWorld {
    ScannerWorld::new()
}

#[given("a camera that grants access")]
fn a_camera_that_grants_access(world: &ScannerWorld) {
    *world.camera.borrow_mut() = Some(Arc::new(FakeCamera::new(true)));
}

#[given("a camera that denies access")]
fn a_camera_that_denies_access(world: &ScannerWorld) {
    *world.camera.borrow_mut() = Some(Arc::new(FakeCamera::new(false)));
}

#[given("a detector that sees {payload} after {misses} empty frames")]
fn a_detector_that_sees(world: &ScannerWorld, payload: String, misses: usize) {
    world.set_detector(Some(payload), misses);
}

#[given("a detector that never sees a code")]
fn a_detector_that_never_sees_a_code(world: &ScannerWorld) {
    world.set_detector(None, 0);
}

#[when("the scanner starts")]
fn the_scanner_starts(world: &ScannerWorld) {
    let store = InMemoryCertificateRecordStore::from_json(REGISTRY.as_bytes())
        .expect("registry fixture parses");
    let native = world
        .detector
        .borrow()
        .clone()
        .map(|detector| detector as Arc<dyn BarcodeDetector>);
    let ports = ScannerPorts {
        camera: world.camera(),
        decoders: DecoderCapabilities {
            native,
            fallback: None,
        },
        verification: Arc::new(CertificateVerificationService::new(Arc::new(store))),
    };
    let config = ScannerConfig {
        frame_interval: Duration::from_millis(1),
        detection_budget: Duration::from_millis(50),
        ..ScannerConfig::default()
    };
    let session = ScanSession::new(ports, config);
    world.runtime.block_on(session.start());
    *world.session.borrow_mut() = Some(session);
}

#[when("the next scan event arrives")]
fn the_next_scan_event_arrives(world: &ScannerWorld) {
    let event = world.with_session(|session| {
        world
            .runtime
            .block_on(async { tokio::time::timeout(EVENT_WAIT, session.next_event()).await })
            .expect("event before timeout")
            .expect("event channel open")
    });
    *world.event.borrow_mut() = Some(event);
}

#[when("the dialog is closed")]
fn the_dialog_is_closed(world: &ScannerWorld) {
    world.with_session(ScanSession::stop);
}

#[then("the scan resolved to {kind}")]
fn the_scan_resolved_to(world: &ScannerWorld, kind: String) {
    match world.event.borrow().as_ref().expect("event received") {
        ScanEvent::Resolved { outcome, .. } => assert_eq!(outcome.kind(), kind),
        other => panic!("expected a resolved scan, got {other:?}"),
    }
}

#[then("the scan failed as malformed")]
fn the_scan_failed_as_malformed(world: &ScannerWorld) {
    let event = world.event.borrow();
    let event = event.as_ref().expect("event received");
    assert!(
        matches!(event, ScanEvent::Failed(ScanFailure::MalformedPayload { .. })),
        "unexpected event {event:?}"
    );
}

#[then("the camera holds no live tracks")]
fn the_camera_holds_no_live_tracks(world: &ScannerWorld) {
    assert_eq!(world.camera().live_tracks(), 0);
    assert!(!world.with_session(|session| session.snapshot().holds_stream));
}

#[then("the session phase is {phase}")]
fn the_session_phase_is(world: &ScannerWorld, phase: String) {
    let current = world.with_session(|session| session.snapshot().phase);
    assert_eq!(current.as_str(), phase);
}

#[then("manual entry is offered")]
fn manual_entry_is_offered(world: &ScannerWorld) {
    let phase = world.with_session(|session| session.snapshot().phase);
    assert!(phase.needs_manual_entry(), "{phase} should offer manual entry");
}

#[then("no frame loop is scheduled")]
fn no_frame_loop_is_scheduled(world: &ScannerWorld) {
    assert!(!world.with_session(|session| session.snapshot().frame_loop_scheduled));
}

#[scenario(
    path = "tests/features/qr_scanner.feature",
    name = "A detected code is verified and the camera released"
)]
fn a_detected_code_is_verified(world: ScannerWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/qr_scanner.feature",
    name = "Denied camera permission falls back to manual entry"
)]
fn denied_permission_falls_back_to_manual_entry(world: ScannerWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/qr_scanner.feature",
    name = "Closing the dialog releases the camera"
)]
fn closing_the_dialog_releases_the_camera(world: ScannerWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/qr_scanner.feature",
    name = "A detected payload without an identifier returns the scanner to idle"
)]
fn a_detected_payload_without_an_identifier_returns_to_idle(world: ScannerWorld) {
    drop(world);
}
