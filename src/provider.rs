//! Provider trait for frame sources

use crate::Result;
use crate::types::Frame;

/// Trait for frame sources feeding the generator
///
/// Providers hide how a frame is produced; the generator only decides
/// when to ask for one.
#[async_trait::async_trait]
pub trait FrameProvider: Send + 'static {
    /// Produce the next frame
    ///
    /// Returns:
    /// - `Ok(frame)` - A complete frame, ready to be queued
    /// - `Err(e)` - Generation failed; the generator logs and backs off
    async fn next_frame(&mut self) -> Result<Frame>;

    /// Source identifier stamped on every frame
    fn source(&self) -> &str;
}
