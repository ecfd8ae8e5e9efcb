//! Detector kinds and their fixed geometry

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{BridgeError, Result};

/// Pulses per train, shared by every detector kind.
pub const PULSES: usize = 32;

/// Modules per detector, shared by every detector kind.
pub const MODULES: usize = 16;

/// Simulated detector kind.
///
/// Each kind fixes a source identifier and a sensor geometry. Kinds only
/// differ in the per-module sensor width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DetectorKind {
    /// Adaptive gain integrating pixel detector, 512x128 pixels per module.
    #[default]
    Agipd,
    /// Large pixel detector, 256x256 pixels per module.
    Lpd,
}

impl DetectorKind {
    /// All supported kinds.
    pub const ALL: [DetectorKind; 2] = [DetectorKind::Agipd, DetectorKind::Lpd];

    /// Source identifier reported in every frame's metadata.
    pub fn source_id(self) -> &'static str {
        match self {
            DetectorKind::Agipd => "SPB_DET_AGIPD1M-1/DET/detector",
            DetectorKind::Lpd => "FXE_DET_LPD1M-1/DET/detector",
        }
    }

    /// Geometry of this detector kind.
    pub fn geometry(self) -> Geometry {
        match self {
            DetectorKind::Agipd => Geometry { pulses: PULSES, modules: MODULES, width: 512, height: 128 },
            DetectorKind::Lpd => Geometry { pulses: PULSES, modules: MODULES, width: 256, height: 256 },
        }
    }

    /// Name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            DetectorKind::Agipd => "AGIPD",
            DetectorKind::Lpd => "LPD",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectorKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AGIPD" => Ok(DetectorKind::Agipd),
            "LPD" => Ok(DetectorKind::Lpd),
            _ => Err(BridgeError::configuration(format!(
                "unsupported detector '{}' (expected AGIPD or LPD)",
                s
            ))),
        }
    }
}

/// Immutable array geometry of a simulated detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    /// Pulses (memory cells) per train
    pub pulses: usize,
    /// Sensor modules
    pub modules: usize,
    /// Pixels along the first sensor axis
    pub width: usize,
    /// Pixels along the second sensor axis
    pub height: usize,
}

impl Geometry {
    /// Create a custom geometry. Every dimension must be non-zero.
    pub fn new(pulses: usize, modules: usize, width: usize, height: usize) -> Result<Self> {
        if pulses == 0 || modules == 0 || width == 0 || height == 0 {
            return Err(BridgeError::configuration(format!(
                "geometry dimensions must be non-zero, got {}x{}x{}x{}",
                pulses, modules, width, height
            )));
        }
        Ok(Self { pulses, modules, width, height })
    }

    /// Image tensor shape `[pulses, modules, width, height]`.
    pub fn shape(&self) -> [usize; 4] {
        [self.pulses, self.modules, self.width, self.height]
    }

    /// Samples in one (pulse, module) slice.
    pub fn slice_len(&self) -> usize {
        self.width * self.height
    }

    /// Samples in the whole image tensor.
    pub fn sample_count(&self) -> usize {
        self.pulses * self.modules * self.slice_len()
    }
}

impl Default for Geometry {
    fn default() -> Self {
        DetectorKind::default().geometry()
    }
}
