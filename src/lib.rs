//! Synthetic detector-frame server for Karabo bridge clients.
//!
//! Bridge Sim fabricates AGIPD or LPD detector trains and serves them over a
//! lock-step ZeroMQ request/reply endpoint, one frame per `next` request, so
//! analysis pipelines can be exercised without a facility connection.
//!
//! # Features
//!
//! - **Bounded buffering**: a background generator keeps up to ten frames ready
//! - **Backpressure**: generation pauses while the queue is full
//! - **Two encodings**: numpy-compatible MessagePack or a Rust-native binary form
//! - **Reproducible data**: optional seeding of the image samples
//!
//! ## Example
//!
//! ```rust,no_run
//! use bridge_sim::{Simulator, SimulatorConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SimulatorConfig::from_options(4545, &["msgpack", "AGIPD"])?;
//!     let simulator = Simulator::bind(config).await?;
//!
//!     let outcome = simulator.run(CancellationToken::new()).await?;
//!     println!("served {} frames", outcome.frames_served);
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(test)]
pub mod test_utils;
pub mod types;

// Frame production
pub mod factory;
pub mod generator;
pub mod provider;
pub mod providers;
pub mod queue;

// Serving
pub mod codec;
pub mod server;
pub mod transport;

// Process composition
pub mod config;
pub mod simulator;

// Core exports
pub use error::*;
pub use types::*;

pub use codec::Encoding;
pub use config::SimulatorConfig;
pub use factory::FrameFactory;
pub use generator::{Generator, GeneratorHandle, GeneratorReport};
pub use provider::FrameProvider;
pub use queue::FrameQueue;
pub use server::{BridgeServer, ServeOutcome, ShutdownReason};
pub use simulator::Simulator;
