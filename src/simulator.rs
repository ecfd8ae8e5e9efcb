//! Process composition: one queue, one generator, one server

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zeromq::Endpoint;

use crate::Result;
use crate::config::SimulatorConfig;
use crate::generator::Generator;
use crate::providers::SyntheticProvider;
use crate::queue::FrameQueue;
use crate::server::{BridgeServer, ServeOutcome};
use crate::transport::ZmqReplyChannel;

/// A bound simulator, ready to serve
pub struct Simulator {
    config: SimulatorConfig,
    channel: ZmqReplyChannel,
}

impl Simulator {
    /// Validate `config` and bind its endpoint.
    ///
    /// Configuration errors are reported before anything is bound.
    pub async fn bind(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        let channel = ZmqReplyChannel::bind(&config.endpoint()).await?;

        info!(
            detector = %config.detector,
            encoding = %config.encoding,
            capacity = config.queue_capacity,
            "Simulator bound"
        );
        Ok(Self { config, channel })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// The resolved endpoint, with the real port when bound to port 0.
    pub fn endpoint(&self) -> &Endpoint {
        self.channel.endpoint()
    }

    /// Generate and serve frames until `cancel` fires or the session ends.
    ///
    /// The generator is always stopped and joined before returning, and the
    /// endpoint is closed.
    pub async fn run(self, cancel: CancellationToken) -> Result<ServeOutcome> {
        let Self { config, channel } = self;

        let queue = Arc::new(FrameQueue::new(config.queue_capacity));
        let provider = SyntheticProvider::for_detector(config.detector, config.seed);
        let generator = Generator::spawn(
            provider,
            Arc::clone(&queue),
            config.poll_interval,
            cancel.child_token(),
        );

        let server = BridgeServer::new(channel, Arc::clone(&queue), config.encoding)
            .with_poll_interval(config.poll_interval);
        let (channel, outcome) = server.serve(&cancel).await;

        match generator.shutdown().await {
            Ok(report) => info!(frames_generated = report.frames_generated, "Generator stopped"),
            Err(e) => warn!("Generator stopped with error: {}", e),
        }
        channel.close().await;

        let outcome = outcome?;
        info!(reason = ?outcome.reason, frames_served = outcome.frames_served, "Session ended");
        Ok(outcome)
    }
}
