//! Camera-based certificate scanning.
//!
//! A [`ScanSession`] backs one open scan dialog. It acquires the camera,
//! runs a per-frame QR detection loop when a platform detector exists, and
//! offers a manual capture path otherwise. The first accepted payload is
//! parsed into a certificate number and verified by exact lookup.
//!
//! Hardware is released on every exit path: success, failure, [`ScanSession::stop`],
//! a new [`ScanSession::start`], and drop. Work still in flight when the
//! session moves on is recognised by its generation number and discarded.

mod decoder;
mod frame_loop;
mod payload;
mod phase;
mod runtime;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub use decoder::{DecoderCapabilities, DecoderStrategy};
pub use payload::{ScanPayloadError, parse_scan_payload};
pub use phase::{ScanFailure, ScanPhase};
pub use runtime::{ScannerConfig, ScannerPorts, TokioFrameTicker};

use crate::domain::ports::{
    BarcodeDetector, CameraAcquisitionError, FrameTicker, MediaStream,
};
use crate::domain::{CertificateNumber, VerificationOutcome};

/// Results produced by the automatic frame loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A code was detected and verified; the session is closed.
    Resolved {
        certificate_number: CertificateNumber,
        outcome: VerificationOutcome,
    },
    /// A code was detected but rejected; the session is idle.
    Failed(ScanFailure),
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSnapshot {
    pub phase: ScanPhase,
    pub holds_stream: bool,
    pub frame_loop_scheduled: bool,
    pub decoder: Option<&'static str>,
    pub last_failure: Option<ScanFailure>,
}

struct FrameLoop {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    /// Called from outside the loop task; abort it.
    Abort,
    /// Called from inside the loop task; let it finish its current step.
    Detach,
}

impl FrameLoop {
    fn end(self, exit: LoopExit) {
        self.stop.store(true, Ordering::Release);
        if exit == LoopExit::Abort {
            self.task.abort();
        }
    }
}

struct ScanState {
    phase: ScanPhase,
    stream: Option<Arc<dyn MediaStream>>,
    strategy: Option<DecoderStrategy>,
    frame_loop: Option<FrameLoop>,
    generation: u64,
    claimed: bool,
    last_failure: Option<ScanFailure>,
}

impl ScanState {
    fn new() -> Self {
        Self {
            phase: ScanPhase::Idle,
            stream: None,
            strategy: None,
            frame_loop: None,
            generation: 0,
            claimed: false,
            last_failure: None,
        }
    }
}

/// How a claimed payload was settled.
enum Settled {
    Resolved {
        certificate_number: CertificateNumber,
        outcome: VerificationOutcome,
    },
    Rejected(ScanFailure),
    /// The session moved on while verification ran.
    Stale,
}

struct ScanCore {
    ports: ScannerPorts,
    config: ScannerConfig,
    ticker: Arc<dyn FrameTicker>,
    state: Mutex<ScanState>,
    events: mpsc::UnboundedSender<ScanEvent>,
}

impl ScanCore {
    fn lock(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_hardware(&self, state: &mut ScanState) {
        if let Some(stream) = state.stream.take() {
            self.ports.camera.detach_preview();
            self.ports.camera.release(stream.as_ref());
            debug!("camera stream released");
        }
    }

    fn teardown(&self, next: ScanPhase) {
        let mut state = self.lock();
        state.generation = state.generation.wrapping_add(1);
        if let Some(frame_loop) = state.frame_loop.take() {
            frame_loop.end(LoopExit::Abort);
        }
        self.release_hardware(&mut state);
        state.strategy = None;
        state.claimed = false;
        state.phase = next;
    }

    fn begin_request(&self) -> u64 {
        let mut state = self.lock();
        state.phase = ScanPhase::RequestingPermission;
        state.last_failure = None;
        state.generation
    }

    fn record_failure(&self, phase: ScanPhase, failure: ScanFailure) -> ScanPhase {
        let mut state = self.lock();
        state.phase = phase;
        state.last_failure = Some(failure);
        phase
    }

    fn acquisition_failed(&self, generation: u64, error: &CameraAcquisitionError) -> ScanPhase {
        let (phase, failure) = match error {
            CameraAcquisitionError::PermissionDenied { .. } => {
                (ScanPhase::PermissionDenied, ScanFailure::PermissionDenied)
            }
            CameraAcquisitionError::NoDevice { .. } => {
                (ScanPhase::NoCamera, ScanFailure::NoCameraFound)
            }
        };
        let mut state = self.lock();
        if state.generation != generation {
            return state.phase;
        }
        state.phase = phase;
        state.last_failure = Some(failure);
        phase
    }

    fn attach(self: &Arc<Self>, generation: u64, stream: Arc<dyn MediaStream>) -> ScanPhase {
        let mut state = self.lock();
        if state.generation != generation || state.phase != ScanPhase::RequestingPermission {
            debug!("session moved on during acquisition, releasing late stream");
            self.ports.camera.release(stream.as_ref());
            return state.phase;
        }

        self.ports.camera.attach_preview(Arc::clone(&stream));
        state.stream = Some(stream);
        let strategy = self.ports.decoders.select();
        info!(decoder = strategy.label(), "camera stream attached");
        if strategy.detects_automatically() {
            state.phase = ScanPhase::Streaming;
            let stop = Arc::new(AtomicBool::new(false));
            let task = tokio::spawn(frame_loop::run(
                Arc::clone(self),
                generation,
                Arc::clone(&stop),
            ));
            state.frame_loop = Some(FrameLoop { stop, task });
        } else {
            state.phase = ScanPhase::CaptureFallback;
        }
        state.strategy = Some(strategy);
        state.phase
    }

    /// Stream and detector for the next frame, or `None` once the loop should
    /// exit. Moves `streaming` to `detecting` when the stream has a frame.
    fn frame_inputs(
        &self,
        generation: u64,
    ) -> Option<(Arc<dyn MediaStream>, Arc<dyn BarcodeDetector>)> {
        let state = self.lock();
        if state.generation != generation
            || !matches!(state.phase, ScanPhase::Streaming | ScanPhase::Detecting)
        {
            return None;
        }
        let stream = state.stream.clone()?;
        match &state.strategy {
            Some(DecoderStrategy::Native(detector)) => Some((stream, Arc::clone(detector))),
            _ => None,
        }
    }

    fn mark_detecting(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation && state.phase == ScanPhase::Streaming {
            state.phase = ScanPhase::Detecting;
        }
    }

    fn capture_inputs(&self) -> Option<(u64, Arc<dyn MediaStream>)> {
        let state = self.lock();
        if !state.phase.holds_camera() {
            return None;
        }
        state
            .stream
            .as_ref()
            .map(|stream| (state.generation, Arc::clone(stream)))
    }

    fn note_failure(&self, generation: u64, failure: ScanFailure) -> ScanFailure {
        let mut state = self.lock();
        if state.generation == generation {
            state.last_failure = Some(failure.clone());
        }
        failure
    }

    /// Take ownership of a decoded payload, stopping the stream and the
    /// frame loop before anything else happens. Returns `false` when the
    /// session already moved on or another path won the race.
    fn claim(&self, generation: u64, exit: LoopExit) -> bool {
        let mut state = self.lock();
        if state.generation != generation || state.claimed || !state.phase.holds_camera() {
            return false;
        }
        state.claimed = true;
        state.phase = ScanPhase::Matched;
        if let Some(frame_loop) = state.frame_loop.take() {
            frame_loop.end(exit);
        }
        self.release_hardware(&mut state);
        true
    }

    fn reject_claim(&self, generation: u64, failure: &ScanFailure) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        state.phase = ScanPhase::Idle;
        state.claimed = false;
        state.strategy = None;
        state.last_failure = Some(failure.clone());
    }

    fn finish_claim(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.phase = ScanPhase::Closed;
        true
    }

    /// Parse a payload claimed by the frame loop. A malformed payload
    /// returns the session to idle.
    async fn settle(&self, generation: u64, raw: &str) -> Settled {
        match parse_scan_payload(raw) {
            Ok(number) => self.verify_claimed(generation, number).await,
            Err(error) => {
                warn!(%error, "scanned payload rejected");
                let failure = ScanFailure::MalformedPayload {
                    reason: error.to_string(),
                };
                self.reject_claim(generation, &failure);
                Settled::Rejected(failure)
            }
        }
    }

    async fn verify_claimed(
        &self,
        generation: u64,
        certificate_number: CertificateNumber,
    ) -> Settled {
        let outcome = self
            .ports
            .verification
            .verify_identifier(&certificate_number)
            .await;
        if !self.finish_claim(generation) {
            debug!("session moved on before verification finished");
            return Settled::Stale;
        }
        info!(
            certificate = %certificate_number,
            outcome = outcome.kind(),
            "scan resolved"
        );
        Settled::Resolved {
            certificate_number,
            outcome,
        }
    }

    fn emit(&self, event: ScanEvent) {
        if self.events.send(event).is_err() {
            debug!("scan event dropped, session receiver gone");
        }
    }
}

/// One scan dialog's worth of camera state.
pub struct ScanSession {
    core: Arc<ScanCore>,
    events: AsyncMutex<mpsc::UnboundedReceiver<ScanEvent>>,
}

impl ScanSession {
    /// Session pacing frames with a Tokio sleep.
    #[must_use]
    pub fn new(ports: ScannerPorts, config: ScannerConfig) -> Self {
        let ticker = Arc::new(TokioFrameTicker::new(config.frame_interval));
        Self::with_ticker(ports, config, ticker)
    }

    #[must_use]
    pub fn with_ticker(
        ports: ScannerPorts,
        config: ScannerConfig,
        ticker: Arc<dyn FrameTicker>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            core: Arc::new(ScanCore {
                ports,
                config,
                ticker,
                state: Mutex::new(ScanState::new()),
                events: tx,
            }),
            events: AsyncMutex::new(rx),
        }
    }

    /// Acquire the camera and begin scanning.
    ///
    /// Any stream held from an earlier start is released first. Returns the
    /// phase reached: `streaming`/`detecting` or `capture-fallback` on
    /// success, otherwise a terminal failure phase.
    #[instrument(skip(self))]
    pub async fn start(&self) -> ScanPhase {
        self.core.teardown(ScanPhase::Idle);

        if !self.core.ports.camera.is_supported() {
            info!("camera capture unsupported");
            return self
                .core
                .record_failure(ScanPhase::Unsupported, ScanFailure::Unsupported);
        }

        let generation = self.core.begin_request();
        match self
            .core
            .ports
            .camera
            .acquire(&self.core.config.constraints)
            .await
        {
            Ok(stream) => self.core.attach(generation, stream),
            Err(error) => {
                warn!(%error, "camera acquisition failed");
                self.core.acquisition_failed(generation, &error)
            }
        }
    }

    /// Decode the current frame on demand.
    ///
    /// `NoCodeDetected` and `MalformedPayload` leave the stream running so
    /// the user can try again; the camera is only released once a valid
    /// identifier has been read.
    #[instrument(skip(self))]
    pub async fn capture(&self) -> Result<VerificationOutcome, ScanFailure> {
        let Some((generation, stream)) = self.core.capture_inputs() else {
            return Err(ScanFailure::NotStreaming);
        };
        let Some(frame) = stream.current_frame() else {
            return Err(self.core.note_failure(generation, ScanFailure::NoCodeDetected));
        };
        let decoded = decoder::decode_capture(
            &self.core.ports.decoders,
            &frame,
            self.core.config.detection_budget,
        )
        .await;
        let Some(raw) = decoded else {
            info!("capture found no code");
            return Err(self.core.note_failure(generation, ScanFailure::NoCodeDetected));
        };
        let certificate_number = match parse_scan_payload(&raw) {
            Ok(number) => number,
            Err(error) => {
                warn!(%error, "captured payload rejected, stream kept");
                let failure = ScanFailure::MalformedPayload {
                    reason: error.to_string(),
                };
                return Err(self.core.note_failure(generation, failure));
            }
        };
        if !self.core.claim(generation, LoopExit::Abort) {
            return Err(ScanFailure::NotStreaming);
        }
        match self.core.verify_claimed(generation, certificate_number).await {
            Settled::Resolved { outcome, .. } => Ok(outcome),
            Settled::Rejected(failure) => Err(failure),
            Settled::Stale => Err(ScanFailure::NotStreaming),
        }
    }

    /// Release the camera and close the session. Safe to call repeatedly.
    pub fn stop(&self) {
        self.core.teardown(ScanPhase::Closed);
    }

    /// Wait for the next frame-loop result.
    pub async fn next_event(&self) -> Option<ScanEvent> {
        self.events.lock().await.recv().await
    }

    #[must_use]
    pub fn snapshot(&self) -> ScanSnapshot {
        let state = self.core.lock();
        ScanSnapshot {
            phase: state.phase,
            holds_stream: state.stream.is_some(),
            frame_loop_scheduled: state
                .frame_loop
                .as_ref()
                .is_some_and(|frame_loop| !frame_loop.task.is_finished()),
            decoder: state.strategy.as_ref().map(DecoderStrategy::label),
            last_failure: state.last_failure.clone(),
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.core.teardown(ScanPhase::Closed);
    }
}
