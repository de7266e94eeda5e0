//! Fixtures shared by unit tests across the pipeline.

use crate::spectral_pipeline::bands::BandAxis;
use crate::spectral_pipeline::bands::axis::{BLUE_GAP_LEN, RED_GAP_START};
use crate::spectral_pipeline::cube::ReflectanceCube;

/// Measured centres at a 6.55 nm pitch from 436.13 nm with a 76 nm jump where
/// the unreliable bands were dropped, roughly the VNIR layout.
pub(crate) fn measured_axis(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let gap = if i >= RED_GAP_START - BLUE_GAP_LEN { 76.0 } else { 0.0 };
            436.13 + i as f64 * 6.55 + gap
        })
        .collect()
}

pub(crate) fn test_axis(measured: usize) -> BandAxis {
    BandAxis::from_measured(&measured_axis(measured)).unwrap()
}

/// Measured cube whose reflectance rises linearly with wavelength and varies
/// a little between pixels.
pub(crate) fn sloped_cube(measured: usize, rows: usize, cols: usize) -> ReflectanceCube {
    let wavelengths = measured_axis(measured);
    ReflectanceCube::new(ndarray::Array3::from_shape_fn(
        (measured, rows, cols),
        |(b, r, c)| 0.05 + (wavelengths[b] - 400.0) * 0.0004 + 0.01 * (r + 2 * c) as f64,
    ))
}
