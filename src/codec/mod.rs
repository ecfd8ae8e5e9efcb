//! Codec module - frame serialization strategies.
//!
//! - [`MsgPackCodec`] - self-describing MessagePack in the Karabo bridge layout, readable
//!   from any language with a MessagePack and numpy decoder
//! - [`NativeCodec`] - `bincode` over the Rust struct layout, only readable by this crate
//!
//! # Design
//!
//! Codecs are marker structs with static methods. The process-wide choice is the closed
//! [`Encoding`] enum, fixed once at startup.
//!
//! # Example
//!
//! ```
//! use bridge_sim::codec::Encoding;
//!
//! let encoding: Encoding = "msgpack".parse().unwrap();
//! assert_eq!(encoding, Encoding::MsgPack);
//! assert!("yaml".parse::<Encoding>().is_err());
//! ```

mod msgpack;
mod native;

pub use msgpack::MsgPackCodec;
pub use native::NativeCodec;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::Frame;
use crate::{BridgeError, Result};

/// Frame encoding selected for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Encoding {
    /// MessagePack with numpy array maps
    #[default]
    MsgPack,
    /// Rust-native binary struct encoding
    Native,
}

impl Encoding {
    /// Encode one frame into a reply payload.
    pub fn encode(self, frame: &Frame) -> Result<Vec<u8>> {
        match self {
            Encoding::MsgPack => MsgPackCodec::encode(frame),
            Encoding::Native => NativeCodec::encode(frame),
        }
    }

    /// Decode a reply payload produced by [`Encoding::encode`].
    pub fn decode(self, bytes: &[u8]) -> Result<Frame> {
        match self {
            Encoding::MsgPack => MsgPackCodec::decode(bytes),
            Encoding::Native => NativeCodec::decode(bytes),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::MsgPack => "msgpack",
            Encoding::Native => "native",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "msgpack" => Ok(Encoding::MsgPack),
            // "pickle" keeps older launch scripts working
            "native" | "pickle" => Ok(Encoding::Native),
            _ => Err(BridgeError::configuration(format!(
                "unsupported encoding '{}' (expected msgpack or native)",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::tiny_frame;

    #[test]
    fn parse_names_and_alias() {
        assert_eq!("msgpack".parse::<Encoding>().unwrap(), Encoding::MsgPack);
        assert_eq!("MsgPack".parse::<Encoding>().unwrap(), Encoding::MsgPack);
        assert_eq!("native".parse::<Encoding>().unwrap(), Encoding::Native);
        assert_eq!("pickle".parse::<Encoding>().unwrap(), Encoding::Native);

        let err = "json".parse::<Encoding>().unwrap_err();
        assert!(err.is_startup_error());
    }

    #[test]
    fn default_is_msgpack() {
        assert_eq!(Encoding::default(), Encoding::MsgPack);
        assert_eq!(Encoding::default().to_string(), "msgpack");
    }

    #[test]
    fn both_encodings_round_trip() {
        let frame = tiny_frame(17);
        for encoding in [Encoding::MsgPack, Encoding::Native] {
            let bytes = encoding.encode(&frame).unwrap();
            let decoded = encoding.decode(&bytes).unwrap();
            assert_eq!(decoded, frame, "{} round trip", encoding);
        }
    }

    #[test]
    fn encodings_are_not_interchangeable() {
        let frame = tiny_frame(3);
        let native = Encoding::Native.encode(&frame).unwrap();
        assert!(Encoding::MsgPack.decode(&native).is_err());
    }
}
