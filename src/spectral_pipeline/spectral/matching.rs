//! Tristimulus colour-matching functions and their remapping onto arbitrary
//! wavelength windows of the band axis.

use std::path::Path;

use ndarray::{Array2, ArrayView2, Axis};
use tracing::debug;

use crate::spectral_pipeline::bands::{BandAxis, BandWindow};
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::spectral::resample::resample_flux;
use crate::spectral_pipeline::tables::{Delimiter, read_table};

/// First wavelength and step of the built-in CIE table.
const CIE_1931_START_NM: f64 = 380.0;
const CIE_1931_STEP_NM: f64 = 5.0;

/// CIE 1931 2° standard observer, 380-780 nm at 5 nm, columns x̄ ȳ z̄.
const CIE_1931: [[f64; 3]; 81] = [
    [0.001368, 0.000039, 0.006450],
    [0.002236, 0.000064, 0.010550],
    [0.004243, 0.000120, 0.020050],
    [0.007650, 0.000217, 0.036210],
    [0.014310, 0.000396, 0.067850],
    [0.023190, 0.000640, 0.110200],
    [0.043510, 0.001210, 0.207400],
    [0.077630, 0.002180, 0.371300],
    [0.134380, 0.004000, 0.645600],
    [0.214770, 0.007300, 1.039050],
    [0.283900, 0.011600, 1.385600],
    [0.328500, 0.016840, 1.622960],
    [0.348280, 0.023000, 1.747060],
    [0.348060, 0.029800, 1.782600],
    [0.336200, 0.038000, 1.772110],
    [0.318700, 0.048000, 1.744100],
    [0.290800, 0.060000, 1.669200],
    [0.251100, 0.073900, 1.528100],
    [0.195360, 0.090980, 1.287640],
    [0.142100, 0.112600, 1.041900],
    [0.095640, 0.139020, 0.812950],
    [0.058010, 0.169300, 0.616200],
    [0.032010, 0.208020, 0.465180],
    [0.014700, 0.258600, 0.353300],
    [0.004900, 0.323000, 0.272000],
    [0.002400, 0.407300, 0.212300],
    [0.009300, 0.503000, 0.158200],
    [0.029100, 0.608200, 0.111700],
    [0.063270, 0.710000, 0.078250],
    [0.109600, 0.793200, 0.057250],
    [0.165500, 0.862000, 0.042160],
    [0.225750, 0.914850, 0.029840],
    [0.290400, 0.954000, 0.020300],
    [0.359700, 0.980300, 0.013400],
    [0.433450, 0.994950, 0.008750],
    [0.512050, 1.000000, 0.005750],
    [0.594500, 0.995000, 0.003900],
    [0.678400, 0.978600, 0.002750],
    [0.762100, 0.952000, 0.002100],
    [0.842500, 0.915400, 0.001800],
    [0.916300, 0.870000, 0.001650],
    [0.978600, 0.816300, 0.001400],
    [1.026300, 0.757000, 0.001100],
    [1.056700, 0.694900, 0.001000],
    [1.062200, 0.631000, 0.000800],
    [1.045600, 0.566800, 0.000600],
    [1.002600, 0.503000, 0.000340],
    [0.938400, 0.441200, 0.000240],
    [0.854450, 0.381000, 0.000190],
    [0.751400, 0.321000, 0.000100],
    [0.642400, 0.265000, 0.000050],
    [0.541900, 0.217000, 0.000030],
    [0.447900, 0.175000, 0.000020],
    [0.360800, 0.138200, 0.000010],
    [0.283500, 0.107000, 0.000000],
    [0.218700, 0.081600, 0.000000],
    [0.164900, 0.061000, 0.000000],
    [0.121200, 0.044580, 0.000000],
    [0.087400, 0.032000, 0.000000],
    [0.063600, 0.023200, 0.000000],
    [0.046770, 0.017000, 0.000000],
    [0.032900, 0.011920, 0.000000],
    [0.022700, 0.008210, 0.000000],
    [0.015840, 0.005723, 0.000000],
    [0.011359, 0.004102, 0.000000],
    [0.008111, 0.002929, 0.000000],
    [0.005790, 0.002091, 0.000000],
    [0.004109, 0.001484, 0.000000],
    [0.002899, 0.001047, 0.000000],
    [0.002049, 0.000740, 0.000000],
    [0.001440, 0.000520, 0.000000],
    [0.001000, 0.000361, 0.000000],
    [0.000690, 0.000249, 0.000000],
    [0.000476, 0.000172, 0.000000],
    [0.000332, 0.000120, 0.000000],
    [0.000235, 0.000085, 0.000000],
    [0.000166, 0.000060, 0.000000],
    [0.000117, 0.000042, 0.000000],
    [0.000083, 0.000030, 0.000000],
    [0.000059, 0.000021, 0.000000],
    [0.000042, 0.000015, 0.000000],];

/// Three response curves sampled on an increasing wavelength grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingFunction {
    wavelengths: Vec<f64>,
    /// One row per wavelength, one column per tristimulus channel.
    responses: Array2<f64>,
}

impl MatchingFunction {
    pub fn new(wavelengths: Vec<f64>, responses: Array2<f64>) -> Result<Self> {
        if responses.dim() != (wavelengths.len(), 3) {
            return Err(PipelineError::BandCountMismatch {
                expected: wavelengths.len(),
                found: responses.len_of(Axis(0)),
            });
        }
        Ok(Self {
            wavelengths,
            responses,
        })
    }

    /// The CIE 1931 2° observer on its 380-780 nm, 5 nm grid.
    pub fn cie_1931() -> Self {
        let wavelengths = (0..CIE_1931.len())
            .map(|i| CIE_1931_START_NM + CIE_1931_STEP_NM * i as f64)
            .collect();
        let responses = Array2::from_shape_fn((CIE_1931.len(), 3), |(i, c)| CIE_1931[i][c]);
        Self {
            wavelengths,
            responses,
        }
    }

    /// Loads a whitespace-delimited `(wavelength, r, g, b)` table.
    pub fn from_table<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let rows = read_table(path, Delimiter::Whitespace)?;
        let mut wavelengths = Vec::with_capacity(rows.len());
        let mut responses = Array2::zeros((rows.len(), 3));
        for (row, values) in rows.iter().enumerate() {
            if values.len() < 4 {
                return Err(PipelineError::TableParseError {
                    path: path.display().to_string(),
                    row,
                    reason: "expected wavelength and three responses".to_string(),
                });
            }
            wavelengths.push(values[0]);
            for channel in 0..3 {
                responses[[row, channel]] = values[channel + 1];
            }
        }
        Self::new(wavelengths, responses)
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn responses(&self) -> ArrayView2<'_, f64> {
        self.responses.view()
    }

    /// Stretches this function's wavelength span onto the window between the
    /// axis bands nearest `low` and `high`, then resamples it onto the band
    /// centres of that window. The last reference sample lands on the band at
    /// the window's upper index. Bands without full coverage get zero.
    ///
    /// Returns one row per window band and one column per channel.
    pub fn remap(&self, axis: &BandAxis, low: f64, high: f64) -> Array2<f64> {
        let window = axis.window(low, high);
        self.remap_window(axis, window)
    }

    pub fn remap_window(&self, axis: &BandAxis, window: BandWindow) -> Array2<f64> {
        let targets = axis.slice(window);
        let (Some(&first), Some(&last)) = (self.wavelengths.first(), self.wavelengths.last())
        else {
            return Array2::zeros((targets.len(), 3));
        };

        let lower = axis.get(window.start);
        let upper = axis.get(window.end);
        let scale = (upper - lower) / (last - first);
        let stretched: Vec<f64> = self
            .wavelengths
            .iter()
            .map(|&w| scale * (w - last) + upper)
            .collect();

        debug!(
            bands = targets.len(),
            from = stretched[0],
            to = upper,
            "Remapping matching function"
        );

        let mut remapped = Array2::zeros((targets.len(), 3));
        for (channel, response) in self.responses.axis_iter(Axis(1)).enumerate() {
            let response = response.to_vec();
            let resampled = resample_flux(targets, &stretched, &response, 0.0);
            for (band, value) in resampled.into_iter().enumerate() {
                remapped[[band, channel]] = value;
            }
        }
        remapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral_pipeline::test_support::test_axis;
    use approx::assert_relative_eq;

    #[test]
    fn test_cie_table_shape() {
        let cmf = MatchingFunction::cie_1931();
        assert_eq!(cmf.wavelengths().len(), 81);
        assert_eq!(cmf.wavelengths()[80], 780.0);
        assert_eq!(cmf.responses()[[35, 1]], 1.0); // ȳ peaks at 555 nm
    }

    #[test]
    fn test_remap_has_one_row_per_window_band() {
        let axis = test_axis(60);
        let cmf = MatchingFunction::cie_1931();
        let window = axis.window(380.0, 780.0);
        let remapped = cmf.remap(&axis, 380.0, 780.0);
        assert_eq!(remapped.dim(), (window.len(), 3));
        assert!(remapped.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_remap_keeps_constant_function_constant() {
        let axis = test_axis(60);
        let flat = MatchingFunction::new(
            (0..81).map(|i| 380.0 + 5.0 * i as f64).collect(),
            Array2::from_elem((81, 3), 0.5),
        )
        .unwrap();
        let remapped = flat.remap(&axis, 450.0, 800.0);
        // every band except the first (whose lower bin edge falls below the
        // stretched grid) is fully covered
        for value in remapped.slice(ndarray::s![1.., ..]).iter() {
            assert_relative_eq!(*value, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_remap_stretches_peak_proportionally() {
        let axis = test_axis(60);
        let cmf = MatchingFunction::cie_1931();
        let window = axis.window(500.0, 850.0);
        let remapped = cmf.remap(&axis, 500.0, 850.0);
        let wavelengths = axis.slice(window);

        let peak = remapped
            .column(1)
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
        // ȳ peaks at 555 nm: 175/400 of the way through 380-780
        let lower = axis.get(window.start);
        let upper = axis.get(window.end);
        let expected = upper - (780.0 - 555.0) / 400.0 * (upper - lower);
        assert!((wavelengths[peak.0] - expected).abs() < 15.0);
    }

    #[test]
    fn test_from_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cie-cmf.txt");
        std::fs::write(&path, "380 0.1 0.2 0.3\n385  0.4 0.5 0.6\n").unwrap();
        let cmf = MatchingFunction::from_table(&path).unwrap();
        assert_eq!(cmf.wavelengths(), &[380.0, 385.0]);
        assert_eq!(cmf.responses()[[1, 2]], 0.6);
    }

    #[test]
    fn test_from_table_rejects_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cie-cmf.txt");
        std::fs::write(&path, "380 0.1 0.2\n").unwrap();
        assert!(matches!(
            MatchingFunction::from_table(&path),
            Err(PipelineError::TableParseError { .. })
        ));
    }
}
