//! Error types for the bridge simulator.
//!
//! All errors implement `std::error::Error` and carry enough context to tell
//! the operator which side of the system failed.
//!
//! ## Error Categories
//!
//! - **Protocol Errors**: The client sent something other than the `next` command
//! - **Configuration Errors**: Unsupported encoding, detector kind or tuning value
//! - **Transport Errors**: Binding, sending or receiving on the reply endpoint failed
//! - **Codec Errors**: A frame could not be encoded or decoded
//! - **Task Errors**: A background generation or encoding task died
//!
//! ## Severity
//!
//! Nothing in the simulator retries on its own. Errors can be asked how they
//! should be treated:
//!
//! ```rust
//! use bridge_sim::BridgeError;
//!
//! let error = BridgeError::protocol_violation(b"stop");
//! assert!(error.is_session_ending());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for simulator operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Protocol violation: unexpected request {request:?}")]
    ProtocolViolation { request: String },

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Transport failure during {operation}")]
    Transport {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    #[error("Native encoding error: {0}")]
    Native(#[from] bincode::Error),

    #[error("Array shape {shape:?} does not match {len} elements")]
    Array { shape: Vec<usize>, len: usize },

    #[error("Decode error: {details}")]
    Decode { details: String },

    #[error("Background task failed: {context}")]
    Task {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BridgeError {
    /// Whether this error should have been caught before the endpoint was bound.
    pub fn is_startup_error(&self) -> bool {
        matches!(self, BridgeError::Configuration { .. })
    }

    /// Whether this error ends the current client session.
    ///
    /// Every variant except configuration errors does: the lock-step protocol
    /// has no way to resume after a failed transaction.
    pub fn is_session_ending(&self) -> bool {
        !self.is_startup_error()
    }

    /// Returns suggested operator actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::ProtocolViolation { .. } => vec![
                "Make sure the client only sends the `next` command",
                "Restart the simulator to open a fresh session",
            ],
            BridgeError::Configuration { .. } => vec![
                "Use one of the supported encodings: msgpack, native",
                "Use one of the supported detectors: AGIPD, LPD",
                "Queue capacity and poll interval must be non-zero",
            ],
            BridgeError::Transport { .. } => vec![
                "Check that the port is free and the address is local",
                "Verify the client is using a REQ socket",
                "Restart the simulator",
            ],
            BridgeError::MsgPackEncode(_)
            | BridgeError::MsgPackDecode(_)
            | BridgeError::Native(_)
            | BridgeError::Decode { .. } => vec![
                "Check that client and server use the same encoding",
                "Native payloads can only be decoded by this crate",
            ],
            BridgeError::Array { .. } => vec!["Check the detector geometry"],
            BridgeError::Task { .. } => vec![
                "Check the logs for a panic in the generator",
                "Restart the simulator",
            ],
        }
    }

    /// Helper constructor for protocol violations; the payload is kept lossily as text.
    pub fn protocol_violation(request: &[u8]) -> Self {
        BridgeError::ProtocolViolation { request: String::from_utf8_lossy(request).into_owned() }
    }

    /// Helper constructor for configuration errors.
    pub fn configuration(reason: impl Into<String>) -> Self {
        BridgeError::Configuration { reason: reason.into() }
    }

    /// Helper constructor for transport errors.
    pub fn transport(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        BridgeError::Transport { operation: operation.into(), source: source.into() }
    }

    /// Helper constructor for decode errors.
    pub fn decode(details: impl Into<String>) -> Self {
        BridgeError::Decode { details: details.into() }
    }

    /// Helper constructor for background task failures.
    pub fn task_failed(context: impl Into<String>) -> Self {
        BridgeError::Task { context: context.into(), source: None }
    }

    /// Helper constructor for background task failures with source.
    pub fn task_failed_with_source(
        context: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Task { context: context.into(), source: Some(source) }
    }
}

impl From<zeromq::ZmqError> for BridgeError {
    fn from(err: zeromq::ZmqError) -> Self {
        BridgeError::Transport { operation: "zeromq".to_string(), source: Box::new(err) }
    }
}

impl From<tokio::task::JoinError> for BridgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        BridgeError::task_failed_with_source("blocking task", Box::new(err))
    }
}
