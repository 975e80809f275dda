//! Port pacing the scan session's frame loop.

use async_trait::async_trait;

/// Resolves once per frame slot.
///
/// Production code waits one display refresh; tests resolve immediately so
/// the loop can be driven deterministically.
#[async_trait]
pub trait FrameTicker: Send + Sync {
    async fn next_frame(&self);
}
