//! MsgPack codec using `rmp-serde`.
//!
//! Frames are written in the Karabo bridge layout: a one-entry map from the
//! source name to a flat map whose keys are the dotted property paths
//! (`image.data`, `header.trainId`, ...). Arrays use the numpy map form from
//! [`NdArray`](crate::types::NdArray).
//!
//! **Always `to_vec_named`**: `to_vec` would write the records as positional
//! arrays, which no Python or C++ client can read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{
    DetectorData, Frame, Header, ImageData, Metadata, NdArray, Trailer,
};
use crate::{BridgeError, Result};

/// MessagePack codec for frames.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a frame to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the frame cannot be serialized.
    #[inline]
    pub fn encode(frame: &Frame) -> Result<Vec<u8>> {
        let mut message = BTreeMap::new();
        message.insert(frame.source(), SourceRecordRef::from(frame));
        Ok(rmp_serde::to_vec_named(&message)?)
    }

    /// Decode MsgPack bytes back into a frame.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a single-source Karabo message.
    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        let message: BTreeMap<String, SourceRecord> = rmp_serde::from_slice(bytes)?;
        if message.len() != 1 {
            return Err(BridgeError::decode(format!(
                "expected exactly one source, found {}",
                message.len()
            )));
        }
        let (source, record) = message
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::decode("empty message"))?;

        if source != record.metadata.source {
            return Err(BridgeError::decode(format!(
                "message key '{}' does not match metadata source '{}'",
                source, record.metadata.source
            )));
        }
        Ok(record.into())
    }
}

/// Borrowed flat view of a frame, in wire key order.
#[derive(Serialize)]
struct SourceRecordRef<'a> {
    metadata: &'a Metadata,

    #[serde(rename = "image.data")]
    image_data: &'a NdArray<u16>,
    #[serde(rename = "image.cellId")]
    image_cell_id: &'a NdArray<u16>,
    #[serde(rename = "image.length")]
    image_length: &'a NdArray<u32>,
    #[serde(rename = "image.pulseId")]
    image_pulse_id: &'a NdArray<u64>,
    #[serde(rename = "image.trainId")]
    image_train_id: &'a NdArray<u64>,
    #[serde(rename = "image.status")]
    image_status: &'a NdArray<u16>,

    #[serde(rename = "trailer.checksum")]
    trailer_checksum: &'a NdArray<i8>,
    #[serde(rename = "trailer.magicNumberEnd")]
    trailer_magic_number_end: &'a NdArray<i8>,
    #[serde(rename = "trailer.status")]
    trailer_status: u64,
    #[serde(rename = "trailer.trainId")]
    trailer_train_id: u64,

    #[serde(rename = "detector.data")]
    detector_data: &'a NdArray<u8>,
    #[serde(rename = "detector.trainId")]
    detector_train_id: u64,

    #[serde(rename = "header.dataId")]
    header_data_id: u64,
    #[serde(rename = "header.linkId")]
    header_link_id: u64,
    #[serde(rename = "header.magicNumberBegin")]
    header_magic_number_begin: &'a NdArray<i8>,
    #[serde(rename = "header.majorTrainFormatVersion")]
    header_major_train_format_version: u64,
    #[serde(rename = "header.minorTrainFormatVersion")]
    header_minor_train_format_version: u64,
    #[serde(rename = "header.pulseCount")]
    header_pulse_count: u64,
    #[serde(rename = "header.reserved")]
    header_reserved: &'a NdArray<u8>,
    #[serde(rename = "header.trainId")]
    header_train_id: u64,
}

impl<'a> From<&'a Frame> for SourceRecordRef<'a> {
    fn from(frame: &'a Frame) -> Self {
        Self {
            metadata: &frame.metadata,
            image_data: &frame.image.data,
            image_cell_id: &frame.image.cell_id,
            image_length: &frame.image.length,
            image_pulse_id: &frame.image.pulse_id,
            image_train_id: &frame.image.train_id,
            image_status: &frame.image.status,
            trailer_checksum: &frame.trailer.checksum,
            trailer_magic_number_end: &frame.trailer.magic_number_end,
            trailer_status: frame.trailer.status,
            trailer_train_id: frame.trailer.train_id,
            detector_data: &frame.detector.data,
            detector_train_id: frame.detector.train_id,
            header_data_id: frame.header.data_id,
            header_link_id: frame.header.link_id,
            header_magic_number_begin: &frame.header.magic_number_begin,
            header_major_train_format_version: frame.header.major_train_format_version,
            header_minor_train_format_version: frame.header.minor_train_format_version,
            header_pulse_count: frame.header.pulse_count,
            header_reserved: &frame.header.reserved,
            header_train_id: frame.header.train_id,
        }
    }
}

/// Owned flat record as read off the wire.
#[derive(Deserialize)]
struct SourceRecord {
    metadata: Metadata,

    #[serde(rename = "image.data")]
    image_data: NdArray<u16>,
    #[serde(rename = "image.cellId")]
    image_cell_id: NdArray<u16>,
    #[serde(rename = "image.length")]
    image_length: NdArray<u32>,
    #[serde(rename = "image.pulseId")]
    image_pulse_id: NdArray<u64>,
    #[serde(rename = "image.trainId")]
    image_train_id: NdArray<u64>,
    #[serde(rename = "image.status")]
    image_status: NdArray<u16>,

    #[serde(rename = "trailer.checksum")]
    trailer_checksum: NdArray<i8>,
    #[serde(rename = "trailer.magicNumberEnd")]
    trailer_magic_number_end: NdArray<i8>,
    #[serde(rename = "trailer.status")]
    trailer_status: u64,
    #[serde(rename = "trailer.trainId")]
    trailer_train_id: u64,

    #[serde(rename = "detector.data")]
    detector_data: NdArray<u8>,
    #[serde(rename = "detector.trainId")]
    detector_train_id: u64,

    #[serde(rename = "header.dataId")]
    header_data_id: u64,
    #[serde(rename = "header.linkId")]
    header_link_id: u64,
    #[serde(rename = "header.magicNumberBegin")]
    header_magic_number_begin: NdArray<i8>,
    #[serde(rename = "header.majorTrainFormatVersion")]
    header_major_train_format_version: u64,
    #[serde(rename = "header.minorTrainFormatVersion")]
    header_minor_train_format_version: u64,
    #[serde(rename = "header.pulseCount")]
    header_pulse_count: u64,
    #[serde(rename = "header.reserved")]
    header_reserved: NdArray<u8>,
    #[serde(rename = "header.trainId")]
    header_train_id: u64,
}

impl From<SourceRecord> for Frame {
    fn from(record: SourceRecord) -> Self {
        Frame {
            metadata: record.metadata,
            image: ImageData {
                data: record.image_data,
                cell_id: record.image_cell_id,
                length: record.image_length,
                pulse_id: record.image_pulse_id,
                train_id: record.image_train_id,
                status: record.image_status,
            },
            trailer: Trailer {
                checksum: record.trailer_checksum,
                magic_number_end: record.trailer_magic_number_end,
                status: record.trailer_status,
                train_id: record.trailer_train_id,
            },
            detector: DetectorData {
                data: record.detector_data,
                train_id: record.detector_train_id,
            },
            header: Header {
                data_id: record.header_data_id,
                link_id: record.header_link_id,
                magic_number_begin: record.header_magic_number_begin,
                major_train_format_version: record.header_major_train_format_version,
                minor_train_format_version: record.header_minor_train_format_version,
                pulse_count: record.header_pulse_count,
                reserved: record.header_reserved,
                train_id: record.header_train_id,
            },
        }
    }
}
