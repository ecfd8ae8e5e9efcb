//! Frame record types
//!
//! A [`Frame`] is one synthetic train readout: metadata plus the image,
//! trailer, detector and header groups a real bridge publishes for a
//! detector source.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::NdArray;

/// Wall-clock derived train timestamp.
///
/// The train id is the integer seconds with the first fractional decimal
/// digit appended, so ids advance every 100ms and two frames stamped within
/// the same tenth of a second share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(rename = "tid")]
    pub train_id: u64,
    /// Whole seconds since the Unix epoch
    pub sec: u64,
    /// Fractional part in microseconds
    pub frac: u64,
}

impl Timestamp {
    /// Timestamp for a time expressed as an offset from the Unix epoch.
    pub fn from_unix(since_epoch: Duration) -> Self {
        let sec = since_epoch.as_secs();
        let frac = u64::from(since_epoch.subsec_micros());
        let tenths = frac / 100_000;
        Self { train_id: sec * 10 + tenths, sec, frac }
    }

    /// Timestamp for the current wall-clock time.
    pub fn now() -> Self {
        // A clock set before 1970 stamps trains at the epoch
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self::from_unix(since_epoch)
    }
}

/// Frame metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    pub timestamp: Timestamp,
}

/// Image group: the detector samples plus per-pulse bookkeeping arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// `[pulses, modules, width, height]` samples
    pub data: NdArray<u16>,
    pub cell_id: NdArray<u16>,
    pub length: NdArray<u32>,
    pub pulse_id: NdArray<u64>,
    pub train_id: NdArray<u64>,
    pub status: NdArray<u16>,
}

/// Trailer group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trailer {
    pub checksum: NdArray<i8>,
    pub magic_number_end: NdArray<i8>,
    pub status: u64,
    pub train_id: u64,
}

/// Opaque detector-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorData {
    pub data: NdArray<u8>,
    pub train_id: u64,
}

/// Train header group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub data_id: u64,
    pub link_id: u64,
    pub magic_number_begin: NdArray<i8>,
    pub major_train_format_version: u64,
    pub minor_train_format_version: u64,
    pub pulse_count: u64,
    pub reserved: NdArray<u8>,
    pub train_id: u64,
}

/// One complete synthetic readout, the unit of generation, buffering and delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub metadata: Metadata,
    pub image: ImageData,
    pub trailer: Trailer,
    pub detector: DetectorData,
    pub header: Header,
}

impl Frame {
    pub fn train_id(&self) -> u64 {
        self.metadata.timestamp.train_id
    }

    pub fn source(&self) -> &str {
        &self.metadata.source
    }

    /// Whether every group carries the metadata train id.
    pub fn is_consistent(&self) -> bool {
        let tid = self.train_id();
        self.image.train_id.as_slice().iter().all(|&t| t == tid)
            && self.trailer.train_id == tid
            && self.detector.train_id == tid
            && self.header.train_id == tid
    }
}
