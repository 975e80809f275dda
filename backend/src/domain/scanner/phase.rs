//! Scan session phases and the failures reported to the user.

use serde::Serialize;

/// Where a scan session currently is.
///
/// ```text
/// idle -> requesting-permission -> streaming -> detecting -> matched -> closed
///                               \-> permission-denied | no-camera
/// idle -> unsupported
/// streaming -> capture-fallback   (no automatic detector)
/// any -> closed                   (stop)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPhase {
    Idle,
    RequestingPermission,
    Unsupported,
    PermissionDenied,
    NoCamera,
    /// Stream attached; decoding not yet running.
    Streaming,
    /// Automatic per-frame detection is running.
    Detecting,
    /// Preview only; the user must press capture.
    CaptureFallback,
    /// A code was accepted and is being verified.
    Matched,
    Closed,
}

impl ScanPhase {
    /// Whether a camera stream is expected to be live in this phase.
    #[must_use]
    pub const fn holds_camera(self) -> bool {
        matches!(self, Self::Streaming | Self::Detecting | Self::CaptureFallback)
    }

    /// Terminal phases that should steer the user to manual entry.
    #[must_use]
    pub const fn needs_manual_entry(self) -> bool {
        matches!(
            self,
            Self::Unsupported | Self::PermissionDenied | Self::NoCamera
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RequestingPermission => "requesting-permission",
            Self::Unsupported => "unsupported",
            Self::PermissionDenied => "permission-denied",
            Self::NoCamera => "no-camera",
            Self::Streaming => "streaming",
            Self::Detecting => "detecting",
            Self::CaptureFallback => "capture-fallback",
            Self::Matched => "matched",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing scan failures. Messages are shown as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanFailure {
    #[error("Camera access was denied. Allow camera access or enter the certificate details manually.")]
    PermissionDenied,
    #[error("No camera was found. Enter the certificate details manually.")]
    NoCameraFound,
    #[error("This device cannot scan QR codes. Enter the certificate details manually.")]
    Unsupported,
    #[error("No QR code was detected. Hold the certificate steady and try again.")]
    NoCodeDetected,
    #[error("The scanned code is not a certificate code ({reason}).")]
    MalformedPayload { reason: String },
    #[error("The camera is not running.")]
    NotStreaming,
}

impl ScanFailure {
    /// Whether trying again in the same session can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NoCodeDetected | Self::MalformedPayload { .. })
    }
}
