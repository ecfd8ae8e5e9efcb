//! Test utilities shared by the unit tests
//!
//! Small frames, scripted providers and an in-memory reply channel so the
//! generator and server can be exercised without sockets or full-size images.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};

use crate::factory::FrameFactory;
use crate::provider::FrameProvider;
use crate::transport::ReplyChannel;
use crate::types::{Frame, Geometry, Timestamp};
use crate::{BridgeError, Result};

/// Source name used by test frames.
pub const TEST_SOURCE: &str = "TEST/DET/detector";

/// A minimal frame whose train id is exactly `train_id`.
pub fn tiny_frame(train_id: u64) -> Frame {
    let geometry = Geometry { pulses: 2, modules: 1, width: 2, height: 2 };
    let timestamp = Timestamp { train_id, sec: train_id / 10, frac: (train_id % 10) * 100_000 };
    FrameFactory::new(TEST_SOURCE, geometry).generate_at(timestamp, &mut rand::thread_rng())
}

/// Provider yielding tiny frames with consecutive train ids.
pub struct SequenceProvider {
    next: u64,
}

impl SequenceProvider {
    pub fn new(first: u64) -> Self {
        Self { next: first }
    }
}

#[async_trait::async_trait]
impl FrameProvider for SequenceProvider {
    async fn next_frame(&mut self) -> Result<Frame> {
        let frame = tiny_frame(self.next);
        self.next += 1;
        Ok(frame)
    }

    fn source(&self) -> &str {
        TEST_SOURCE
    }
}

/// Releases frames to a [`GatedProvider`] one permit at a time.
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn release(&self, frames: usize) {
        self.0.add_permits(frames);
    }
}

/// Provider that only produces a frame when its [`Gate`] allows it.
pub struct GatedProvider {
    permits: Arc<Semaphore>,
    inner: SequenceProvider,
}

impl GatedProvider {
    pub fn new() -> (Self, Gate) {
        let permits = Arc::new(Semaphore::new(0));
        let provider = Self { permits: Arc::clone(&permits), inner: SequenceProvider::new(0) };
        (provider, Gate(permits))
    }
}

#[async_trait::async_trait]
impl FrameProvider for GatedProvider {
    async fn next_frame(&mut self) -> Result<Frame> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BridgeError::task_failed("gate closed"))?;
        permit.forget();
        self.inner.next_frame().await
    }

    fn source(&self) -> &str {
        TEST_SOURCE
    }
}

/// Provider whose every call fails.
pub struct FailingProvider;

#[async_trait::async_trait]
impl FrameProvider for FailingProvider {
    async fn next_frame(&mut self) -> Result<Frame> {
        Err(BridgeError::task_failed("scripted failure"))
    }

    fn source(&self) -> &str {
        TEST_SOURCE
    }
}

/// Server side of an in-memory lock-step conversation.
pub struct MemoryChannel {
    requests: mpsc::UnboundedReceiver<Vec<u8>>,
    replies: mpsc::UnboundedSender<Vec<u8>>,
}

/// Client side of an in-memory lock-step conversation.
pub struct MemoryClient {
    requests: mpsc::UnboundedSender<Vec<u8>>,
    replies: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryChannel {
    pub fn pair() -> (MemoryChannel, MemoryClient) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        (
            MemoryChannel { requests: request_rx, replies: reply_tx },
            MemoryClient { requests: request_tx, replies: reply_rx },
        )
    }
}

#[async_trait::async_trait]
impl ReplyChannel for MemoryChannel {
    async fn recv_request(&mut self) -> Result<Vec<u8>> {
        self.requests
            .recv()
            .await
            .ok_or_else(|| BridgeError::transport("recv", "client disconnected"))
    }

    async fn send_reply(&mut self, payload: Vec<u8>) -> Result<()> {
        self.replies
            .send(payload)
            .map_err(|_| BridgeError::transport("send", "client disconnected"))
    }
}

impl MemoryClient {
    pub async fn send(&mut self, request: &[u8]) {
        self.requests.send(request.to_vec()).expect("server dropped");
    }

    /// The next reply, or `None` if nothing arrives within `wait`.
    pub async fn try_recv_within(&mut self, wait: Duration) -> Option<Vec<u8>> {
        tokio::time::timeout(wait, self.replies.recv()).await.ok().flatten()
    }
}
