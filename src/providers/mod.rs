//! Frame provider implementations

pub mod synthetic;

pub use synthetic::SyntheticProvider;
