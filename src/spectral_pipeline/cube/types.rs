//! Reflectance cube types

use std::ops::Range;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, s};

use crate::spectral_pipeline::common::error::{PipelineError, Result};

/// A hyperspectral cube of reflectance-like values indexed (band, row, column).
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectanceCube {
    data: Array3<f64>,
}

impl ReflectanceCube {
    pub fn new(data: Array3<f64>) -> Self {
        Self { data }
    }

    pub fn zeros(bands: usize, rows: usize, cols: usize) -> Self {
        Self::new(Array3::zeros((bands, rows, cols)))
    }

    /// Builds a cube whose every pixel carries the same spectrum.
    pub fn uniform(spectrum: &[f64], rows: usize, cols: usize) -> Self {
        Self::new(Array3::from_shape_fn(
            (spectrum.len(), rows, cols),
            |(b, _, _)| spectrum[b],
        ))
    }

    pub fn bands(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array3<f64> {
        self.data
    }

    pub fn band(&self, index: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), index)
    }

    /// Zeroes the sentinel values used for nulls and edge-of-scene fill:
    /// anything below zero or at/above one.
    pub fn sanitize(mut self) -> Self {
        self.data.mapv_inplace(|v| if (0.0..1.0).contains(&v) { v } else { 0.0 });
        self
    }

    /// Copies the half-open band range out into a new cube. A reversed or
    /// empty range yields a cube with zero bands.
    pub fn slice_bands(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.bands());
        let start = range.start.min(end);
        Self::new(self.data.slice(s![start..end, .., ..]).to_owned())
    }

    /// Mean over every value of the half-open band range.
    pub fn mean_over_bands(&self, range: Range<usize>) -> f64 {
        let end = range.end.min(self.bands());
        let start = range.start.min(end);
        self.data
            .slice(s![start..end, .., ..])
            .mean()
            .unwrap_or(f64::NAN)
    }

    /// Multiplies each band by its own factor.
    pub fn scale_bands(mut self, factors: &[f64]) -> Result<Self> {
        if factors.len() != self.bands() {
            return Err(PipelineError::BandCountMismatch {
                expected: self.bands(),
                found: factors.len(),
            });
        }
        for (mut band, &factor) in self.data.axis_iter_mut(Axis(0)).zip(factors) {
            band *= factor;
        }
        Ok(self)
    }

    /// Spatial plane of zeros matching this cube.
    pub fn empty_plane(&self) -> Array2<f64> {
        Array2::zeros((self.rows(), self.cols()))
    }
}

impl From<Array3<f64>> for ReflectanceCube {
    fn from(data: Array3<f64>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sanitize_zeroes_sentinels() {
        let cube = ReflectanceCube::new(array![[[-1.0, 0.25], [1.0, 65535.0]], [[0.0, 0.999], [0.5, -0.0001]]]);
        let cube = cube.sanitize();
        assert_eq!(
            cube.into_inner(),
            array![[[0.0, 0.25], [0.0, 0.0]], [[0.0, 0.999], [0.5, 0.0]]]
        );
    }

    #[test]
    fn test_slice_bands_is_half_open() {
        let cube = ReflectanceCube::uniform(&[0.1, 0.2, 0.3, 0.4], 2, 3);
        let sliced = cube.slice_bands(1..3);
        assert_eq!(sliced.bands(), 2);
        assert_eq!(sliced.band(0)[[1, 2]], 0.2);
        assert_eq!(sliced.band(1)[[0, 0]], 0.3);
    }

    #[test]
    fn test_slice_bands_reversed_range_is_empty() {
        let cube = ReflectanceCube::uniform(&[0.1, 0.2, 0.3], 1, 1);
        assert_eq!(cube.slice_bands(2..1).bands(), 0);
        assert_eq!(cube.slice_bands(2..10).bands(), 1);
    }

    #[test]
    fn test_scale_bands() {
        let cube = ReflectanceCube::uniform(&[0.1, 0.2], 1, 2);
        let scaled = cube.scale_bands(&[2.0, 0.5]).unwrap();
        assert_eq!(scaled.band(0)[[0, 1]], 0.2);
        assert_eq!(scaled.band(1)[[0, 0]], 0.1);
    }

    #[test]
    fn test_scale_bands_length_mismatch() {
        let cube = ReflectanceCube::uniform(&[0.1, 0.2], 1, 1);
        assert!(matches!(
            cube.scale_bands(&[1.0]),
            Err(PipelineError::BandCountMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_mean_over_bands() {
        let cube = ReflectanceCube::uniform(&[0.1, 0.3, 0.5], 2, 2);
        assert!((cube.mean_over_bands(0..2) - 0.2).abs() < 1e-12);
    }
}
