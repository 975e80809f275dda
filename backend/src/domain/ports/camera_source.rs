//! Port for acquiring a live camera stream.
//!
//! Adapters own the device handles. The scan session only ever holds a
//! stream through [`MediaStream`] and must hand it back via
//! [`CameraSource::release`] on every exit path.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised while acquiring a camera.
    pub enum CameraAcquisitionError {
        /// The user or platform refused camera access.
        PermissionDenied { message: String } =>
            "camera permission denied: {message}",
        /// No camera satisfies the requested constraints.
        NoDevice { message: String } =>
            "no usable camera: {message}",
    }
}

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Rear camera, pointed at the document.
    #[default]
    Environment,
    User,
}

/// Preferred stream parameters. Adapters treat sizes as ideals, not minimums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// Raised when frame dimensions and pixel data disagree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("frame of {width}x{height} needs {expected} RGBA bytes, got {actual}")]
pub struct VideoFrameError {
    pub width: u32,
    pub height: u32,
    pub expected: usize,
    pub actual: usize,
}

/// One RGBA8 frame copied out of the stream.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, VideoFrameError> {
        let expected = usize::try_from(u64::from(width) * u64::from(height) * 4)
            .unwrap_or(usize::MAX);
        if pixels.len() != expected {
            return Err(VideoFrameError {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// A live stream handed out by [`CameraSource::acquire`].
pub trait MediaStream: Send + Sync {
    /// Latest decoded frame, or `None` before playback starts or after the
    /// tracks are stopped.
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Number of tracks still capturing.
    fn live_track_count(&self) -> usize;

    /// Stop every track. Must be idempotent.
    fn stop_all_tracks(&self);
}

/// Camera hardware plus the preview surface the stream is shown on.
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Whether the platform offers camera capture at all.
    fn is_supported(&self) -> bool;

    /// Prompt for permission if needed and open a stream.
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Arc<dyn MediaStream>, CameraAcquisitionError>;

    /// Show `stream` on the preview surface.
    fn attach_preview(&self, stream: Arc<dyn MediaStream>);

    /// Clear the preview surface's source reference.
    fn detach_preview(&self);

    /// Return the stream's hardware.
    fn release(&self, stream: &dyn MediaStream) {
        stream.stop_all_tracks();
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn frame_accepts_matching_buffer() {
        let frame = VideoFrame::new(2, 2, vec![0; 16]).expect("valid frame");
        assert_eq!((frame.width(), frame.height()), (2, 2));
        assert_eq!(frame.pixels().len(), 16);
    }

    #[rstest]
    #[case(2, 2, 15)]
    #[case(0, 4, 4)]
    fn frame_rejects_mismatched_buffer(#[case] width: u32, #[case] height: u32, #[case] len: usize) {
        let err = VideoFrame::new(width, height, vec![0; len]).expect_err("size mismatch");
        assert_eq!(err.actual, len);
    }

    #[test]
    fn default_constraints_prefer_rear_hd() {
        let constraints = StreamConstraints::default();
        assert_eq!(constraints.facing_mode, FacingMode::Environment);
        assert_eq!((constraints.ideal_width, constraints.ideal_height), (1280, 720));
    }

    #[test]
    fn acquisition_errors_have_snake_case_constructors() {
        let err = CameraAcquisitionError::permission_denied("NotAllowedError");
        assert_eq!(err.to_string(), "camera permission denied: NotAllowedError");
    }
}
