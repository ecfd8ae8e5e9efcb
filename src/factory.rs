//! Synthetic frame construction

use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::types::{
    DetectorData, Frame, Geometry, Header, ImageData, Metadata, NdArray, Timestamp, Trailer,
};

/// Lower bound of the simulated intensity band (inclusive).
pub const INTENSITY_LOW: f64 = 1500.0;

/// Upper bound of the simulated intensity band (exclusive).
pub const INTENSITY_HIGH: f64 = 1600.0;

/// Per-pulse readout length reported in the image group.
pub const PULSE_LENGTH: u32 = 131_072;

/// Size of the opaque detector payload.
pub const DETECTOR_PAYLOAD_LEN: usize = 416;

/// Link id sentinel sent in every header.
pub const LINK_ID: u64 = u64::MAX;

pub const MAJOR_TRAIN_FORMAT_VERSION: u64 = 2;
pub const MINOR_TRAIN_FORMAT_VERSION: u64 = 1;

/// Builds frames for one source with one geometry.
///
/// Frame structure is fixed by the geometry; only the image samples and the
/// timestamp vary between calls.
#[derive(Debug, Clone)]
pub struct FrameFactory {
    source: String,
    geometry: Geometry,
}

impl FrameFactory {
    pub fn new(source: impl Into<String>, geometry: Geometry) -> Self {
        Self { source: source.into(), geometry }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Generate a frame stamped with the current wall-clock time.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Frame {
        self.generate_at(Timestamp::now(), rng)
    }

    /// Generate a frame with an explicit timestamp.
    pub fn generate_at<R: Rng + ?Sized>(&self, timestamp: Timestamp, rng: &mut R) -> Frame {
        let tid = timestamp.train_id;
        let pulses = self.geometry.pulses;

        Frame {
            metadata: Metadata { source: self.source.clone(), timestamp },
            image: ImageData {
                data: self.sample_image(rng),
                cell_id: NdArray::from_vec((0..pulses).map(|i| i as u16).collect()),
                length: NdArray::filled(pulses, PULSE_LENGTH),
                pulse_id: NdArray::from_vec((0..pulses as u64).collect()),
                train_id: NdArray::filled(pulses, tid),
                status: NdArray::filled(pulses, 0),
            },
            trailer: Trailer {
                checksum: NdArray::filled(16, 1),
                magic_number_end: NdArray::filled(8, 1),
                status: 0,
                train_id: tid,
            },
            detector: DetectorData { data: NdArray::filled(DETECTOR_PAYLOAD_LEN, 1), train_id: tid },
            header: Header {
                data_id: 0,
                link_id: LINK_ID,
                magic_number_begin: NdArray::filled(8, 1),
                major_train_format_version: MAJOR_TRAIN_FORMAT_VERSION,
                minor_train_format_version: MINOR_TRAIN_FORMAT_VERSION,
                pulse_count: pulses as u64,
                reserved: NdArray::filled(16, 1),
                train_id: tid,
            },
        }
    }

    fn sample_image<R: Rng + ?Sized>(&self, rng: &mut R) -> NdArray<u16> {
        let band = Uniform::new(INTENSITY_LOW, INTENSITY_HIGH);
        let slice_len = self.geometry.slice_len();
        let mut samples = Vec::with_capacity(self.geometry.sample_count());

        for _pulse in 0..self.geometry.pulses {
            for _module in 0..self.geometry.modules {
                // Truncation keeps every sample inside [1500, 1599]
                samples.extend((0..slice_len).map(|_| band.sample(rng) as u16));
            }
        }

        NdArray::from_shape_unchecked(self.geometry.shape().to_vec(), samples)
    }
}

/// Generate one frame for `source` using the thread-local RNG.
pub fn generate(source: &str, geometry: Geometry) -> Frame {
    FrameFactory::new(source, geometry).generate(&mut rand::thread_rng())
}
