//! Colorimetry module
//!
//! A colour system is three primary chromaticities plus a white point. The
//! XYZ→RGB matrix is derived once per system and shared read-only by every
//! pixel conversion of a run.

pub mod system;
mod transform;

pub use system::{Chromaticity, ColourSystem, Illuminant, NamedColourSystem};
pub use transform::SpectralConverter;
