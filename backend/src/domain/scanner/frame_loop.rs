//! Per-frame detection loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use super::decoder::{FrameDetection, detect_within_budget};
use super::{LoopExit, ScanCore, ScanEvent, Settled};

pub(super) async fn run(core: Arc<ScanCore>, generation: u64, stop: Arc<AtomicBool>) {
    loop {
        core.ticker.next_frame().await;
        if stop.load(Ordering::Acquire) {
            return;
        }
        let Some((stream, detector)) = core.frame_inputs(generation) else {
            return;
        };
        let Some(frame) = stream.current_frame() else {
            continue;
        };
        core.mark_detecting(generation);

        match detect_within_budget(detector.as_ref(), &frame, core.config.detection_budget).await
        {
            FrameDetection::Found(raw) => {
                if stop.load(Ordering::Acquire) || !core.claim(generation, LoopExit::Detach) {
                    debug!("discarding late detection");
                    return;
                }
                match core.settle(generation, &raw).await {
                    Settled::Resolved {
                        certificate_number,
                        outcome,
                    } => core.emit(ScanEvent::Resolved {
                        certificate_number,
                        outcome,
                    }),
                    Settled::Rejected(failure) => core.emit(ScanEvent::Failed(failure)),
                    Settled::Stale => {}
                }
                return;
            }
            FrameDetection::Skipped => trace!("detection overran frame budget, frame skipped"),
            FrameDetection::Miss | FrameDetection::Failed => {}
        }
    }
}
