//! Spectral weighting module
//!
//! Flux-conserving resampling, colour-matching-function remapping, filter
//! integration and flat-field calibration. Each stage takes the cube by value
//! or by reference and returns a new value.

mod resample;
pub mod matching;
pub mod integrate;
pub mod calibration;

pub use resample::resample_flux;
pub use matching::MatchingFunction;
pub use integrate::{SignificantWindow, integrate_filter};
pub use calibration::{CalibrationLookup, CalibrationSpectrum};
