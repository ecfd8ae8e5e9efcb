//! ZeroMQ REP endpoint

use tracing::{debug, info};
use zeromq::{Endpoint, RepSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use super::ReplyChannel;
use crate::{BridgeError, Result};

/// REP socket bound to a TCP endpoint
pub struct ZmqReplyChannel {
    socket: RepSocket,
    endpoint: Endpoint,
}

impl ZmqReplyChannel {
    /// Bind a REP socket, e.g. to `tcp://0.0.0.0:4545`.
    ///
    /// Port 0 binds a free port; [`ZmqReplyChannel::endpoint`] reports which.
    pub async fn bind(endpoint: &str) -> Result<Self> {
        let mut socket = RepSocket::new();
        let endpoint = socket
            .bind(endpoint)
            .await
            .map_err(|e| BridgeError::transport(format!("bind {}", endpoint), e))?;

        info!(%endpoint, "Reply endpoint bound");
        Ok(Self { socket, endpoint })
    }

    /// The resolved endpoint the socket is listening on.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Close the socket, dropping any connected client.
    pub async fn close(self) {
        let errors = self.socket.close().await;
        for error in errors {
            debug!("Error while closing socket: {}", error);
        }
        info!(endpoint = %self.endpoint, "Reply endpoint closed");
    }
}

#[async_trait::async_trait]
impl ReplyChannel for ZmqReplyChannel {
    async fn recv_request(&mut self) -> Result<Vec<u8>> {
        let message = self
            .socket
            .recv()
            .await
            .map_err(|e| BridgeError::transport("recv", e))?;

        let mut parts = message.into_vec();
        if parts.len() != 1 {
            // Only a single-frame `next` is a valid request
            let joined = parts.iter().map(|part| &part[..]).collect::<Vec<&[u8]>>().join(&b'|');
            return Err(BridgeError::protocol_violation(&joined));
        }
        Ok(parts.remove(0).to_vec())
    }

    async fn send_reply(&mut self, payload: Vec<u8>) -> Result<()> {
        self.socket
            .send(ZmqMessage::from(payload))
            .await
            .map_err(|e| BridgeError::transport("send", e))
    }
}
