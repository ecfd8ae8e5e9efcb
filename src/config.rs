//! Startup configuration.
//!
//! A [`SimulatorConfig`] is built once from the command line and never
//! mutated afterwards. Everything that can be wrong with it is reported by
//! [`SimulatorConfig::validate`] before the endpoint is bound.

use std::time::Duration;
use tracing::debug;

use crate::codec::Encoding;
use crate::generator::DEFAULT_POLL_INTERVAL;
use crate::queue::DEFAULT_CAPACITY;
use crate::types::{DetectorKind, Geometry};
use crate::{BridgeError, Result};

/// Address the endpoint binds to unless told otherwise.
pub const DEFAULT_HOST: &str = "0.0.0.0";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Canonical configuration of one simulator process.
pub struct SimulatorConfig {
    /// Interface address to bind.
    pub host: String,
    /// TCP port to bind; 0 picks a free one.
    pub port: u16,
    /// Reply payload encoding.
    pub encoding: Encoding,
    /// Simulated detector, fixing source id and geometry.
    pub detector: DetectorKind,
    /// Frames buffered ahead of the client.
    pub queue_capacity: usize,
    /// Upper bound between queue re-checks.
    pub poll_interval: Duration,
    /// Seed for reproducible image samples.
    pub seed: Option<u64>,
}

impl SimulatorConfig {
    /// Configuration with every default and the given port.
    pub fn new(port: u16) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port,
            encoding: Encoding::default(),
            detector: DetectorKind::default(),
            queue_capacity: DEFAULT_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            seed: None,
        }
    }

    /// Configuration from a port and positional `[SER] [DET]` options, in any order.
    ///
    /// The first encoding and the first detector named win; later tokens of
    /// the same kind are ignored. Unknown tokens are still rejected.
    pub fn from_options<S: AsRef<str>>(port: u16, options: &[S]) -> Result<Self> {
        let mut config = Self::new(port);
        let mut encoding_set = false;
        let mut detector_set = false;

        for option in options {
            match parse_option(option.as_ref())? {
                PositionalOption::Encoding(encoding) if !encoding_set => {
                    config.encoding = encoding;
                    encoding_set = true;
                }
                PositionalOption::Detector(detector) if !detector_set => {
                    config.detector = detector;
                    detector_set = true;
                }
                _ => debug!(option = option.as_ref(), "Ignoring repeated option"),
            }
        }
        Ok(config)
    }

    /// Apply one positional option naming either an encoding or a detector.
    pub fn apply_option(&mut self, option: &str) -> Result<()> {
        match parse_option(option)? {
            PositionalOption::Encoding(encoding) => self.encoding = encoding,
            PositionalOption::Detector(detector) => self.detector = detector,
        }
        Ok(())
    }

    /// Check the tuning values.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(BridgeError::configuration("queue capacity must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(BridgeError::configuration("poll interval must be non-zero"));
        }
        if self.host.is_empty() {
            return Err(BridgeError::configuration("bind host must not be empty"));
        }
        Ok(())
    }

    /// ZeroMQ endpoint string, e.g. `tcp://0.0.0.0:4545`.
    pub fn endpoint(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }

    pub fn geometry(&self) -> Geometry {
        self.detector.geometry()
    }

    pub fn source_id(&self) -> &'static str {
        self.detector.source_id()
    }
}

enum PositionalOption {
    Encoding(Encoding),
    Detector(DetectorKind),
}

fn parse_option(option: &str) -> Result<PositionalOption> {
    if let Ok(encoding) = option.parse::<Encoding>() {
        return Ok(PositionalOption::Encoding(encoding));
    }
    if let Ok(detector) = option.parse::<DetectorKind>() {
        return Ok(PositionalOption::Detector(detector));
    }
    Err(BridgeError::configuration(format!(
        "unrecognized option '{}' (expected msgpack, native, AGIPD or LPD)",
        option
    )))
}
