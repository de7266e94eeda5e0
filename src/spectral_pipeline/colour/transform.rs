use nalgebra::Vector3;
use ndarray::{Array3, ArrayView1, ArrayView2, Axis, Zip};
use tracing::instrument;

use super::system::ColourSystem;
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::cube::ReflectanceCube;

/// Converts spectra sampled on a cube's band axis to display RGB.
///
/// `cmf` holds one `(x̄, ȳ, z̄)` row per band, usually produced by
/// [`MatchingFunction::remap`](crate::spectral_pipeline::spectral::MatchingFunction::remap).
#[derive(Debug, Clone, Copy)]
pub struct SpectralConverter<'a> {
    system: &'a ColourSystem,
    cmf: ArrayView2<'a, f64>,
}

impl<'a> SpectralConverter<'a> {
    pub fn new(system: &'a ColourSystem, cmf: ArrayView2<'a, f64>) -> Self {
        Self { system, cmf }
    }

    /// Integrates the spectrum against the matching functions and
    /// normalises to chromaticity. A zero integral is returned as is.
    pub fn spectrum_to_xyz(&self, spectrum: ArrayView1<f64>) -> Vector3<f64> {
        let mut xyz = Vector3::zeros();
        for (value, row) in spectrum.iter().zip(self.cmf.rows()) {
            xyz.x += value * row[0];
            xyz.y += value * row[1];
            xyz.z += value * row[2];
        }
        let total = xyz.sum();
        if total == 0.0 { xyz } else { xyz / total }
    }

    pub fn spectrum_to_rgb(&self, spectrum: ArrayView1<f64>) -> Vector3<f64> {
        self.system.xyz_to_rgb(&self.spectrum_to_xyz(spectrum))
    }

    /// Per-pixel RGB for a whole cube, as a `(3, rows, cols)` array.
    #[instrument(skip_all, fields(rows = cube.rows(), cols = cube.cols()))]
    pub fn cube_to_rgb(&self, cube: &ReflectanceCube) -> Result<Array3<f64>> {
        if cube.bands() != self.cmf.nrows() {
            return Err(PipelineError::BandCountMismatch {
                expected: self.cmf.nrows(),
                found: cube.bands(),
            });
        }

        let mut rgb = Array3::zeros((3, cube.rows(), cube.cols()));
        Zip::from(rgb.lanes_mut(Axis(0)))
            .and(cube.data().lanes(Axis(0)))
            .par_for_each(|mut out, spectrum| {
                let value = self.spectrum_to_rgb(spectrum);
                out[0] = value.x;
                out[1] = value.y;
                out[2] = value.z;
            });
        Ok(rgb)
    }
}
