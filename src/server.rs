//! Request/reply serving loop
//!
//! The server answers each `next` request with exactly one buffered frame,
//! oldest first:
//!
//! ```text
//! AwaitingRequest --"next"--> AwaitingData --frame queued--> Replying --sent--> AwaitingRequest
//!        |
//!        +--anything else--> session ends, no reply
//! ```
//!
//! While `AwaitingData` the client's request stays unanswered; lock-step
//! transport semantics guarantee no second request arrives meanwhile.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::codec::Encoding;
use crate::generator::DEFAULT_POLL_INTERVAL;
use crate::queue::FrameQueue;
use crate::transport::ReplyChannel;
use crate::{BridgeError, Result};

/// The only command the protocol understands.
pub const NEXT_COMMAND: &[u8] = b"next";

/// A well-formed client request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Deliver the oldest buffered frame
    Next,
}

impl Request {
    /// Parse a raw request payload.
    ///
    /// Anything other than the exact bytes `next` is a protocol violation.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload == NEXT_COMMAND {
            Ok(Request::Next)
        } else {
            Err(BridgeError::protocol_violation(payload))
        }
    }
}

/// Position in the request/reply cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    AwaitingRequest,
    AwaitingData,
    Replying,
}

/// Why a serving session ended without an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The cancellation token fired
    Cancelled,
    /// The client sent an unrecognized request
    ProtocolViolation { request: String },
}

/// Result of a completed serving session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOutcome {
    pub reason: ShutdownReason,
    pub frames_served: u64,
}

/// Serves buffered frames over a [`ReplyChannel`]
pub struct BridgeServer<C> {
    channel: C,
    queue: Arc<FrameQueue>,
    encoding: Encoding,
    poll_interval: Duration,
    state: ServerState,
}

impl<C: ReplyChannel> BridgeServer<C> {
    pub fn new(channel: C, queue: Arc<FrameQueue>, encoding: Encoding) -> Self {
        Self {
            channel,
            queue,
            encoding,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: ServerState::AwaitingRequest,
        }
    }

    /// Upper bound between re-checks of an empty queue.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Run the serving loop until cancelled, a protocol violation, or a failure.
    ///
    /// The channel is handed back alongside the outcome so the caller decides when
    /// to close it. Cancellation is honoured while waiting for a request or for
    /// data, never in the middle of sending a reply.
    pub async fn serve(mut self, cancel: &CancellationToken) -> (C, Result<ServeOutcome>) {
        let result = self.serve_loop(cancel).await;
        (self.channel, result)
    }

    async fn serve_loop(&mut self, cancel: &CancellationToken) -> Result<ServeOutcome> {
        info!(encoding = %self.encoding, "Serving frames");
        let mut frames_served = 0u64;

        loop {
            self.state = ServerState::AwaitingRequest;
            let payload = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Server cancelled while awaiting request");
                    return Ok(ServeOutcome { reason: ShutdownReason::Cancelled, frames_served });
                }
                payload = self.channel.recv_request() => payload,
            };

            match payload.and_then(|payload| Request::parse(&payload)) {
                Ok(Request::Next) => trace!("Received next request"),
                Err(BridgeError::ProtocolViolation { request }) => {
                    warn!(%request, "Wrong request, ending session");
                    return Ok(ServeOutcome {
                        reason: ShutdownReason::ProtocolViolation { request },
                        frames_served,
                    });
                }
                Err(e) => return Err(e),
            }

            self.state = ServerState::AwaitingData;
            if self.queue.is_empty() {
                debug!("Queue empty, holding reply until a frame is buffered");
            }
            let frame = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Server cancelled while awaiting data");
                    return Ok(ServeOutcome { reason: ShutdownReason::Cancelled, frames_served });
                }
                frame = self.queue.pop_wait(self.poll_interval) => frame,
            };

            self.state = ServerState::Replying;
            let train_id = frame.train_id();
            let encoding = self.encoding;
            let payload = tokio::task::spawn_blocking(move || encoding.encode(&frame)).await??;
            let bytes = payload.len();

            self.channel.send_reply(payload).await?;
            frames_served += 1;
            debug!(train_id, bytes, queued = self.queue.len(), "Sent frame");
        }
    }
}
