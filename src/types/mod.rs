//! Core data types for synthetic detector frames.
//!
//! ## Architecture
//!
//! - [`DetectorKind`] and [`Geometry`] fix the array shapes once at startup
//! - [`NdArray`] holds typed samples and serializes the way numpy clients expect
//! - [`Frame`] is the complete train record: metadata, image, trailer, detector and header groups
//! - [`Timestamp`] derives the coarse, time-based train id
//!
//! ## Usage Example
//!
//! ```rust
//! use bridge_sim::types::{DetectorKind, NdArray};
//!
//! let geometry = DetectorKind::Lpd.geometry();
//! assert_eq!(geometry.shape(), [32, 16, 256, 256]);
//!
//! let cells = NdArray::from_vec((0..geometry.pulses as u16).collect());
//! assert_eq!(cells.dtype(), "<u2");
//! assert_eq!(cells.get(&[31]), Some(31));
//! ```

mod array;
mod frame;
mod geometry;

pub use array::{Element, NdArray};
pub use frame::{DetectorData, Frame, Header, ImageData, Metadata, Timestamp, Trailer};
pub use geometry::{DetectorKind, Geometry, MODULES, PULSES};
