//! Band grid module
//!
//! Builds the canonical band-centre wavelength axis (including the two
//! synthesized gap runs), locates bands by wavelength, crops cubes to a
//! wavelength window and reconstructs the gap bands.

pub mod axis;
mod locator;
mod crop;
mod gaps;

pub use axis::BandAxis;
pub use locator::{BandWindow, find_band};
pub use crop::crop_bands;
pub use gaps::{reconstruct_gaps, strip_gaps};
