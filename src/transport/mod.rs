//! Transport layer - the request/reply endpoint the server speaks on.
//!
//! [`ReplyChannel`] is one lock-step conversation: a request must be answered
//! before the next one is received. [`ZmqReplyChannel`] implements it over a
//! ZeroMQ REP socket, the transport real bridge clients connect with.

pub mod zmq;

pub use zmq::ZmqReplyChannel;

use crate::Result;

/// Lock-step request/reply endpoint
#[async_trait::async_trait]
pub trait ReplyChannel: Send {
    /// Wait for the next request payload
    ///
    /// A request the channel can already tell is malformed is reported as
    /// [`BridgeError::ProtocolViolation`](crate::BridgeError::ProtocolViolation).
    ///
    /// Waits without a timeout; an absent client stalls the server indefinitely.
    async fn recv_request(&mut self) -> Result<Vec<u8>>;

    /// Send the reply to the request last received
    async fn send_reply(&mut self, payload: Vec<u8>) -> Result<()>;
}
