//! Canonical band-centre wavelength axis.
//!
//! The measured MTRDR axis is missing the short-wavelength end of the VNIR
//! detector and a run of unreliable bands around 640-700 nm. Both runs are
//! filled with evenly spaced placeholder wavelengths so that band `i` of a
//! reconstructed cube always corresponds to entry `i` of this axis.

use std::path::Path;

use tracing::debug;

use crate::spectral_pipeline::bands::locator::{BandWindow, find_band};
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::tables::{Delimiter, read_table};

/// Placeholder run prepended below the first measured band.
pub const BLUE_GAP_START: usize = 0;
pub const BLUE_GAP_LEN: usize = 9;
pub const BLUE_GAP_SPAN: (f64, f64) = (377.58, 429.62);

/// Placeholder run inserted over the unreliable mid-spectrum bands. The start
/// index is in the reconstructed axis.
pub const RED_GAP_START: usize = 40;
pub const RED_GAP_LEN: usize = 10;
pub const RED_GAP_SPAN: (f64, f64) = (637.96, 703.1);

/// Total placeholder bands added to a measured cube.
pub const SYNTHESIZED_BANDS: usize = BLUE_GAP_LEN + RED_GAP_LEN;

/// Column of the axis table holding band-centre wavelengths.
const AXIS_TABLE_COLUMN: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct BandAxis {
    wavelengths: Vec<f64>,
}

impl BandAxis {
    /// Builds the axis from the measured band centres, in order.
    pub fn from_measured(measured: &[f64]) -> Result<Self> {
        let min_measured = RED_GAP_START - BLUE_GAP_LEN;
        if measured.len() < min_measured {
            return Err(PipelineError::BandCountMismatch {
                expected: min_measured,
                found: measured.len(),
            });
        }

        let mut wavelengths = Vec::with_capacity(measured.len() + SYNTHESIZED_BANDS);
        wavelengths.extend(linspace_rounded(BLUE_GAP_SPAN.0, BLUE_GAP_SPAN.1, BLUE_GAP_LEN));
        wavelengths.extend_from_slice(measured);
        wavelengths.splice(
            RED_GAP_START..RED_GAP_START,
            linspace_rounded(RED_GAP_SPAN.0, RED_GAP_SPAN.1, RED_GAP_LEN),
        );

        debug!(
            measured = measured.len(),
            total = wavelengths.len(),
            "Built band axis"
        );
        Ok(Self { wavelengths })
    }

    /// Loads the measured band centres from the third column of a
    /// comma-delimited axis table.
    pub fn from_table<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let rows = read_table(path, Delimiter::Comma)?;
        let measured = rows
            .iter()
            .enumerate()
            .map(|(row, values)| {
                values.get(AXIS_TABLE_COLUMN).copied().ok_or_else(|| {
                    PipelineError::TableParseError {
                        path: path.display().to_string(),
                        row,
                        reason: format!("expected at least {} columns", AXIS_TABLE_COLUMN + 1),
                    }
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Self::from_measured(&measured)
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    /// Number of bands a measured cube must have to be reconstructed onto
    /// this axis.
    pub fn measured_len(&self) -> usize {
        self.len() - SYNTHESIZED_BANDS
    }

    pub fn get(&self, index: usize) -> f64 {
        self.wavelengths[index]
    }

    pub fn find_band(&self, wavelength: f64) -> usize {
        find_band(&self.wavelengths, wavelength)
    }

    pub fn window(&self, low: f64, high: f64) -> BandWindow {
        BandWindow::locate(&self.wavelengths, low, high)
    }

    /// Wavelengths of the bands inside `window`.
    pub fn slice(&self, window: BandWindow) -> &[f64] {
        &self.wavelengths[window.range()]
    }

    pub fn is_synthesized(&self, index: usize) -> bool {
        is_synthesized_index(index)
    }
}

/// Whether band `index` of a reconstructed cube is a placeholder.
pub fn is_synthesized_index(index: usize) -> bool {
    (BLUE_GAP_START..BLUE_GAP_START + BLUE_GAP_LEN).contains(&index)
        || (RED_GAP_START..RED_GAP_START + RED_GAP_LEN).contains(&index)
}

/// Evenly spaced values from `start` to `stop` inclusive, each rounded to two
/// decimals with ties to even.
fn linspace_rounded(start: f64, stop: f64, count: usize) -> Vec<f64> {
    let step = (stop - start) / (count - 1) as f64;
    (0..count)
        .map(|i| {
            let value = if i + 1 == count {
                stop
            } else {
                i as f64 * step + start
            };
            (value * 100.0).round_ties_even() / 100.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral_pipeline::test_support::measured_axis;

    #[test]
    fn test_blue_placeholders_match_reference_rounding() {
        assert_eq!(
            linspace_rounded(BLUE_GAP_SPAN.0, BLUE_GAP_SPAN.1, BLUE_GAP_LEN),
            vec![377.58, 384.08, 390.59, 397.1, 403.6, 410.1, 416.61, 423.12, 429.62]
        );
    }

    #[test]
    fn test_red_placeholders_match_reference_rounding() {
        assert_eq!(
            linspace_rounded(RED_GAP_SPAN.0, RED_GAP_SPAN.1, RED_GAP_LEN),
            vec![637.96, 645.2, 652.44, 659.67, 666.91, 674.15, 681.39, 688.62, 695.86, 703.1]
        );
    }

    #[test]
    fn test_axis_layout() {
        let measured = measured_axis(60);
        let axis = BandAxis::from_measured(&measured).unwrap();

        assert_eq!(axis.len(), 60 + SYNTHESIZED_BANDS);
        assert_eq!(axis.measured_len(), 60);
        assert_eq!(axis.get(0), 377.58);
        assert_eq!(axis.get(BLUE_GAP_LEN), measured[0]);
        assert_eq!(axis.get(RED_GAP_START - 1), measured[30]);
        assert_eq!(axis.get(RED_GAP_START), 637.96);
        assert_eq!(axis.get(RED_GAP_START + RED_GAP_LEN), measured[31]);
        assert!(axis.is_synthesized(8));
        assert!(!axis.is_synthesized(9));
        assert!(axis.is_synthesized(49));
        assert!(!axis.is_synthesized(50));
    }

    #[test]
    fn test_axis_is_deterministic_and_increasing() {
        let measured = measured_axis(80);
        let first = BandAxis::from_measured(&measured).unwrap();
        let second = BandAxis::from_measured(&measured).unwrap();

        assert_eq!(first, second);
        assert!(first.wavelengths().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_short_measured_axis_is_rejected() {
        let result = BandAxis::from_measured(&measured_axis(10));
        assert!(matches!(
            result,
            Err(PipelineError::BandCountMismatch { expected: 31, found: 10 })
        ));
    }

    #[test]
    fn test_from_table_reads_third_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mtrdr_axis.tab");
        let text: String = measured_axis(40)
            .iter()
            .enumerate()
            .map(|(i, w)| format!("{},{},{:.3}\n", i, i + 1, w))
            .collect();
        std::fs::write(&path, text).unwrap();

        let axis = BandAxis::from_table(&path).unwrap();
        assert_eq!(axis.len(), 40 + SYNTHESIZED_BANDS);
        assert!((axis.get(BLUE_GAP_LEN) - 436.13).abs() < 1e-9);
    }
}
