//! Native codec using `bincode`.
//!
//! The payload mirrors the Rust struct layout field by field. It is compact and
//! fast but carries no field names, so only a build of this crate can read it.

use crate::Result;
use crate::types::Frame;

/// Rust-native binary codec for frames.
pub struct NativeCodec;

impl NativeCodec {
    /// Encode a frame to bincode bytes.
    #[inline]
    pub fn encode(frame: &Frame) -> Result<Vec<u8>> {
        Ok(bincode::serialize(frame)?)
    }

    /// Decode bincode bytes back into a frame.
    #[inline]
    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        Ok(bincode::deserialize(bytes)?)
    }
}
