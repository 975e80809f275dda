//! Ports for QR decoding.
//!
//! [`BarcodeDetector`] models a platform detector fast enough to run on
//! every frame. [`FallbackDecoder`] is a slower pure-software decoder used
//! only when the user presses capture.

use async_trait::async_trait;

use super::camera_source::VideoFrame;
use super::define_port_error;

define_port_error! {
    /// Errors raised by a platform barcode detector.
    pub enum BarcodeDetectionError {
        /// The platform detector cannot run, e.g. QR is not among its formats.
        Unavailable { message: String } => "barcode detector unavailable: {message}",
        /// The detector failed to process the frame.
        Failed { message: String } => "barcode detection failed: {message}",
    }
}

/// A code found by a [`BarcodeDetector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedBarcode {
    pub raw_value: String,
}

/// Text decoded by a [`FallbackDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub data: String,
}

/// Platform QR detector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BarcodeDetector: Send + Sync {
    /// Codes visible in `frame`, possibly none.
    async fn detect(&self, frame: &VideoFrame)
    -> Result<Vec<DetectedBarcode>, BarcodeDetectionError>;
}

/// Software QR decoder over raw RGBA pixels.
#[cfg_attr(test, mockall::automock)]
pub trait FallbackDecoder: Send + Sync {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<DecodedPayload>;
}
