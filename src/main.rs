//! bridge-sim - serve synthetic detector frames to Karabo bridge clients.
//!
//! ```text
//! bridge-sim 4545 msgpack AGIPD
//! bridge-sim 4545 LPD native --seed 7
//! ```

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bridge_sim::{ShutdownReason, Simulator, SimulatorConfig};

#[derive(Parser, Debug)]
#[command(name = "bridge-sim", version, about = "Synthetic Karabo bridge frame server")]
struct Args {
    /// TCP port to serve on
    port: u16,

    /// Encoding (msgpack | native) and detector (AGIPD | LPD), in any order
    #[arg(value_name = "SER|DET", num_args = 0..=2)]
    options: Vec<String>,

    /// Interface address to bind
    #[arg(long, default_value = bridge_sim::config::DEFAULT_HOST)]
    host: String,

    /// Frames buffered ahead of the client
    #[arg(long, default_value_t = bridge_sim::queue::DEFAULT_CAPACITY)]
    capacity: usize,

    /// Milliseconds between queue re-checks
    #[arg(long = "poll-ms", default_value_t = 100)]
    poll_ms: u64,

    /// Seed for reproducible image data
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn into_config(self) -> bridge_sim::Result<SimulatorConfig> {
        let mut config = SimulatorConfig::from_options(self.port, &self.options)?;
        config.host = self.host;
        config.queue_capacity = self.capacity;
        config.poll_interval = Duration::from_millis(self.poll_ms);
        config.seed = self.seed;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Args::parse().into_config().context("invalid command line")?;
    let simulator = match Simulator::bind(config).await {
        Ok(simulator) => simulator,
        Err(e) => {
            for hint in e.recovery_suggestions() {
                error!("{}", hint);
            }
            return Err(e).context("failed to start simulator");
        }
    };
    info!(endpoint = %simulator.endpoint(), "Simulated Karabo bridge listening");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
        }
        on_signal.cancel();
    });

    let outcome = simulator.run(cancel).await.context("simulator failed")?;
    if let ShutdownReason::ProtocolViolation { request } = &outcome.reason {
        info!(%request, "Client sent an unknown request");
    }
    info!(frames_served = outcome.frames_served, "Exiting");
    Ok(())
}
