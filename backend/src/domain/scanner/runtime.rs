//! Port bundle and runtime settings for a scan session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{
    CameraSource, CertificateVerification, FrameTicker, StreamConstraints,
};

use super::decoder::DecoderCapabilities;

/// Collaborators a scan session drives.
#[derive(Clone)]
pub struct ScannerPorts {
    pub camera: Arc<dyn CameraSource>,
    pub decoders: DecoderCapabilities,
    pub verification: Arc<dyn CertificateVerification>,
}

/// Timing and stream preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerConfig {
    pub constraints: StreamConstraints,
    /// Delay between frame slots; one display refresh by default.
    pub frame_interval: Duration,
    /// Longest a single detection may run before the frame is skipped.
    pub detection_budget: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            constraints: StreamConstraints::default(),
            frame_interval: Duration::from_millis(16),
            detection_budget: Duration::from_millis(12),
        }
    }
}

/// Tokio-based frame ticker.
#[derive(Debug, Clone, Copy)]
pub struct TokioFrameTicker {
    interval: Duration,
}

impl TokioFrameTicker {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl FrameTicker for TokioFrameTicker {
    async fn next_frame(&self) {
        tokio::time::sleep(self.interval).await;
    }
}
