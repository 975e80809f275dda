//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod barcode_decoder;
mod camera_source;
mod certificate_record_store;
mod certificate_verification;
mod frame_ticker;

#[cfg(test)]
pub use barcode_decoder::{MockBarcodeDetector, MockFallbackDecoder};
pub use barcode_decoder::{
    BarcodeDetectionError, BarcodeDetector, DecodedPayload, DetectedBarcode, FallbackDecoder,
};
pub use camera_source::{
    CameraAcquisitionError, CameraSource, FacingMode, MediaStream, StreamConstraints,
    VideoFrame, VideoFrameError,
};
#[cfg(test)]
pub use certificate_record_store::MockCertificateRecordStore;
pub use certificate_record_store::{CertificateRecordStore, CertificateStoreError};
#[cfg(test)]
pub use certificate_verification::MockCertificateVerification;
pub use certificate_verification::CertificateVerification;
pub use frame_ticker::FrameTicker;
