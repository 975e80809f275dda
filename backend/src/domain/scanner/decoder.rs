//! Decoder selection.
//!
//! Capabilities are checked once when a stream starts and the resulting
//! [`DecoderStrategy`] is used for the rest of the session.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::ports::{BarcodeDetector, FallbackDecoder, VideoFrame};

/// Decoders available on this platform.
#[derive(Clone, Default)]
pub struct DecoderCapabilities {
    pub native: Option<Arc<dyn BarcodeDetector>>,
    pub fallback: Option<Arc<dyn FallbackDecoder>>,
}

impl DecoderCapabilities {
    /// Pick how frames will be decoded for this session.
    #[must_use]
    pub fn select(&self) -> DecoderStrategy {
        match (&self.native, &self.fallback) {
            (Some(native), _) => DecoderStrategy::Native(Arc::clone(native)),
            (None, Some(_)) => DecoderStrategy::CaptureOnly,
            (None, None) => DecoderStrategy::PreviewOnly,
        }
    }
}

/// How a session decodes frames.
#[derive(Clone)]
pub enum DecoderStrategy {
    /// Platform detector runs on every frame.
    Native(Arc<dyn BarcodeDetector>),
    /// No live detector; the fallback decoder runs on capture.
    CaptureOnly,
    /// Nothing can decode; capture will always report no code.
    PreviewOnly,
}

impl DecoderStrategy {
    #[must_use]
    pub const fn detects_automatically(&self) -> bool {
        matches!(self, Self::Native(_))
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Native(_) => "native",
            Self::CaptureOnly => "capture-only",
            Self::PreviewOnly => "preview-only",
        }
    }
}

impl std::fmt::Debug for DecoderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of running the native detector on one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum FrameDetection {
    Found(String),
    Miss,
    /// Detection overran the frame budget and was abandoned.
    Skipped,
    Failed,
}

pub(super) async fn detect_within_budget(
    detector: &dyn BarcodeDetector,
    frame: &VideoFrame,
    budget: Duration,
) -> FrameDetection {
    match tokio::time::timeout(budget, detector.detect(frame)).await {
        Err(_) => FrameDetection::Skipped,
        Ok(Err(error)) => {
            debug!(%error, "frame detection failed");
            FrameDetection::Failed
        }
        Ok(Ok(codes)) => codes
            .into_iter()
            .map(|code| code.raw_value)
            .find(|value| !value.trim().is_empty())
            .map_or(FrameDetection::Miss, FrameDetection::Found),
    }
}

/// Decode a captured frame, native detector first, then the fallback.
pub(super) async fn decode_capture(
    capabilities: &DecoderCapabilities,
    frame: &VideoFrame,
    budget: Duration,
) -> Option<String> {
    if let Some(native) = &capabilities.native {
        if let FrameDetection::Found(raw) =
            detect_within_budget(native.as_ref(), frame, budget).await
        {
            return Some(raw);
        }
    }
    let fallback = capabilities.fallback.as_ref()?;
    fallback
        .decode(frame.pixels(), frame.width(), frame.height())
        .map(|payload| payload.data)
        .filter(|data| !data.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{
        BarcodeDetectionError, DecodedPayload, DetectedBarcode, MockBarcodeDetector,
        MockFallbackDecoder,
    };

    fn frame() -> VideoFrame {
        VideoFrame::new(1, 1, vec![0; 4]).expect("valid frame")
    }

    fn detector(codes: Vec<&'static str>) -> Arc<dyn BarcodeDetector> {
        let mut mock = MockBarcodeDetector::new();
        mock.expect_detect().returning(move |_| {
            Ok(codes
                .iter()
                .map(|raw| DetectedBarcode {
                    raw_value: (*raw).to_owned(),
                })
                .collect())
        });
        Arc::new(mock)
    }

    fn fallback(result: Option<&'static str>) -> Arc<dyn FallbackDecoder> {
        let mut mock = MockFallbackDecoder::new();
        mock.expect_decode().returning(move |_, _, _| {
            result.map(|data| DecodedPayload {
                data: data.to_owned(),
            })
        });
        Arc::new(mock)
    }

    #[rstest]
    #[case(true, true, "native")]
    #[case(true, false, "native")]
    #[case(false, true, "capture-only")]
    #[case(false, false, "preview-only")]
    fn selection_prefers_native_detector(
        #[case] has_native: bool,
        #[case] has_fallback: bool,
        #[case] expected: &str,
    ) {
        let capabilities = DecoderCapabilities {
            native: has_native.then(|| detector(Vec::new())),
            fallback: has_fallback.then(|| fallback(None)),
        };
        assert_eq!(capabilities.select().label(), expected);
    }

    #[tokio::test]
    async fn detection_skips_blank_codes() {
        let native = detector(vec!["  ", "CERTIFICATE:KTM-1"]);
        let found = detect_within_budget(native.as_ref(), &frame(), Duration::from_secs(1)).await;
        assert_eq!(found, FrameDetection::Found("CERTIFICATE:KTM-1".to_owned()));
    }

    #[tokio::test]
    async fn detector_errors_are_reported_as_failed() {
        let mut mock = MockBarcodeDetector::new();
        mock.expect_detect()
            .returning(|_| Err(BarcodeDetectionError::failed("decoder crashed")));
        let found = detect_within_budget(&mock, &frame(), Duration::from_secs(1)).await;
        assert_eq!(found, FrameDetection::Failed);
    }

    #[tokio::test]
    async fn capture_falls_back_to_library_decoder() {
        let capabilities = DecoderCapabilities {
            native: Some(detector(Vec::new())),
            fallback: Some(fallback(Some("CERTIFICATE:KTM-2"))),
        };
        let decoded = decode_capture(&capabilities, &frame(), Duration::from_secs(1)).await;
        assert_eq!(decoded.as_deref(), Some("CERTIFICATE:KTM-2"));
    }

    #[tokio::test]
    async fn capture_without_decoders_finds_nothing() {
        let decoded =
            decode_capture(&DecoderCapabilities::default(), &frame(), Duration::from_secs(1))
                .await;
        assert!(decoded.is_none());
    }
}
