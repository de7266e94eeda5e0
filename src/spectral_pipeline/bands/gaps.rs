//! Gap band reconstruction.
//!
//! Both placeholder runs are filled per pixel by linear extrapolation from the
//! neighbouring measured bands. The slope is the mean of three band-pair
//! differences to damp band-to-band noise. Pair and divisor indices are kept
//! exactly as the reference products were generated with, including the
//! asymmetric divisors of the red-gap pairs.

use ndarray::{Array2, Array3, ArrayView3, Axis, concatenate, s};
use tracing::debug;

use crate::spectral_pipeline::bands::axis::{
    BLUE_GAP_LEN, BandAxis, RED_GAP_LEN, RED_GAP_START, is_synthesized_index,
};
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::cube::ReflectanceCube;

/// `(cube[left] - cube[right]) / (axis[upper] - axis[lower])`
struct SlopePair {
    left: usize,
    right: usize,
    lower: usize,
    upper: usize,
}

/// Measured bands averaged into the blue-gap baseline.
const BLUE_BASELINE_BANDS: usize = 6;

/// Cube indices address the measured cube; axis indices the full axis.
const BLUE_SLOPE_PAIRS: [SlopePair; 3] = [
    SlopePair { left: 2, right: 6, lower: 2, upper: 6 },
    SlopePair { left: 1, right: 5, lower: 1, upper: 5 },
    SlopePair { left: 0, right: 4, lower: 0, upper: 4 },
];

/// Last measured band before the red gap, in both the blue-extended cube and
/// the full axis.
const RED_ANCHOR: usize = RED_GAP_START - 1;

/// Cube indices address the blue-extended cube (red gap not yet inserted).
const RED_SLOPE_PAIRS: [SlopePair; 3] = [
    SlopePair { left: 37, right: 40, lower: 39, upper: 50 },
    SlopePair { left: 38, right: 41, lower: 38, upper: 51 },
    SlopePair { left: 39, right: 42, lower: 37, upper: 52 },
];

/// Measured bands needed to reach the highest red-gap slope band.
const MIN_MEASURED_BANDS: usize = 43 - BLUE_GAP_LEN;

/// Rebuilds a full-axis cube from a measured cube by synthesizing both gap
/// runs. The measured cube must hold exactly the measured bands of `axis`.
pub fn reconstruct_gaps(measured: &ReflectanceCube, axis: &BandAxis) -> Result<ReflectanceCube> {
    if measured.bands() != axis.measured_len() {
        return Err(PipelineError::BandCountMismatch {
            expected: axis.measured_len(),
            found: measured.bands(),
        });
    }
    if measured.bands() < MIN_MEASURED_BANDS {
        return Err(PipelineError::BandCountMismatch {
            expected: MIN_MEASURED_BANDS,
            found: measured.bands(),
        });
    }
    let wavelengths = axis.wavelengths();

    let blue = blue_gap(measured.view(), wavelengths);
    let extended = concatenate(Axis(0), &[blue.view(), measured.view()]).map_err(shape_error)?;

    let red = red_gap(extended.view(), wavelengths);
    let full = concatenate(
        Axis(0),
        &[
            extended.slice(s![..RED_GAP_START, .., ..]),
            red.view(),
            extended.slice(s![RED_GAP_START.., .., ..]),
        ],
    )
    .map_err(shape_error)?;

    debug!(
        measured = measured.bands(),
        reconstructed = full.len_of(Axis(0)),
        "Reconstructed gap bands"
    );
    Ok(ReflectanceCube::new(full))
}

/// Drops the placeholder bands of a reconstructed cube, leaving the measured
/// bands in order.
pub fn strip_gaps(cube: &ReflectanceCube) -> Result<ReflectanceCube> {
    if cube.bands() < RED_GAP_START + RED_GAP_LEN {
        return Err(PipelineError::BandCountMismatch {
            expected: RED_GAP_START + RED_GAP_LEN,
            found: cube.bands(),
        });
    }
    let measured: Vec<usize> = (0..cube.bands())
        .filter(|&band| !is_synthesized_index(band))
        .collect();
    Ok(ReflectanceCube::new(cube.data().select(Axis(0), &measured)))
}

fn blue_gap(measured: ArrayView3<'_, f64>, wavelengths: &[f64]) -> Array3<f64> {
    let baseline = mean_of_bands(measured, BLUE_BASELINE_BANDS);
    let slope = averaged_slope(measured, wavelengths, &BLUE_SLOPE_PAIRS);
    let anchor = wavelengths[BLUE_GAP_LEN];
    extrapolate(&baseline, &slope, (0..BLUE_GAP_LEN).map(|k| anchor - wavelengths[k]))
}

fn red_gap(extended: ArrayView3<'_, f64>, wavelengths: &[f64]) -> Array3<f64> {
    let baseline = extended.index_axis(Axis(0), RED_ANCHOR).to_owned();
    let slope = averaged_slope(extended, wavelengths, &RED_SLOPE_PAIRS);
    let anchor = wavelengths[RED_ANCHOR];
    extrapolate(
        &baseline,
        &slope,
        (RED_GAP_START..RED_GAP_START + RED_GAP_LEN).map(|k| wavelengths[k] - anchor),
    )
}

fn mean_of_bands(cube: ArrayView3<'_, f64>, count: usize) -> Array2<f64> {
    let mut sum = cube.index_axis(Axis(0), 0).to_owned();
    for band in 1..count {
        sum += &cube.index_axis(Axis(0), band);
    }
    sum / count as f64
}

fn averaged_slope(cube: ArrayView3<'_, f64>, wavelengths: &[f64], pairs: &[SlopePair]) -> Array2<f64> {
    let mut slopes = pairs.iter().map(|pair| {
        let difference = &cube.index_axis(Axis(0), pair.left) - &cube.index_axis(Axis(0), pair.right);
        difference / (wavelengths[pair.upper] - wavelengths[pair.lower])
    });
    let plane = (cube.len_of(Axis(1)), cube.len_of(Axis(2)));
    let first = slopes.next().unwrap_or_else(|| Array2::zeros(plane));
    slopes.fold(first, |total, slope| total + slope) / pairs.len() as f64
}

/// One band per distance: `baseline + slope * distance`.
fn extrapolate(
    baseline: &Array2<f64>,
    slope: &Array2<f64>,
    distances: impl ExactSizeIterator<Item = f64>,
) -> Array3<f64> {
    let (rows, cols) = baseline.dim();
    let mut fill = Array3::zeros((distances.len(), rows, cols));
    for (mut band, distance) in fill.axis_iter_mut(Axis(0)).zip(distances) {
        band.assign(&(baseline + &(slope * distance)));
    }
    fill
}

fn shape_error(e: ndarray::ShapeError) -> PipelineError {
    PipelineError::DecodeError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral_pipeline::test_support::{sloped_cube, test_axis};
    use approx::assert_relative_eq;

    #[test]
    fn test_reconstructed_cube_matches_axis() {
        let axis = test_axis(60);
        let measured = sloped_cube(60, 3, 4);
        let full = reconstruct_gaps(&measured, &axis).unwrap();

        assert_eq!(full.bands(), axis.len());
        assert_eq!((full.rows(), full.cols()), (3, 4));
        // measured bands land on their own axis positions
        assert_eq!(full.band(BLUE_GAP_LEN), measured.band(0));
        assert_eq!(full.band(RED_ANCHOR), measured.band(RED_ANCHOR - BLUE_GAP_LEN));
        assert_eq!(full.band(RED_GAP_START + RED_GAP_LEN), measured.band(RED_ANCHOR - BLUE_GAP_LEN + 1));
    }

    #[test]
    fn test_flat_spectrum_fills_flat() {
        let axis = test_axis(50);
        let measured = ReflectanceCube::uniform(&[0.3; 50], 2, 2);
        let full = reconstruct_gaps(&measured, &axis).unwrap();
        for value in full.data().iter() {
            assert_relative_eq!(*value, 0.3, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_blue_gap_extrapolates_downward_for_rising_spectrum() {
        let axis = test_axis(50);
        let measured = sloped_cube(50, 1, 1);
        let full = reconstruct_gaps(&measured, &axis).unwrap();

        let baseline: f64 = (0..BLUE_BASELINE_BANDS).map(|b| measured.band(b)[[0, 0]]).sum::<f64>()
            / BLUE_BASELINE_BANDS as f64;
        // rising reflectance gives a negative pair slope; the first placeholder
        // is the furthest from the anchor and therefore the darkest
        let first = full.band(0)[[0, 0]];
        let last = full.band(BLUE_GAP_LEN - 1)[[0, 0]];
        assert!(first < last);
        assert!(last < baseline);
    }

    #[test]
    fn test_blue_gap_value_formula() {
        let axis = test_axis(50);
        let measured = sloped_cube(50, 1, 1);
        let full = reconstruct_gaps(&measured, &axis).unwrap();
        let w = axis.wavelengths();
        let m = |b: usize| measured.band(b)[[0, 0]];

        let baseline = (0..6).map(m).sum::<f64>() / 6.0;
        let slope = ((m(2) - m(6)) / (w[6] - w[2])
            + (m(1) - m(5)) / (w[5] - w[1])
            + (m(0) - m(4)) / (w[4] - w[0]))
            / 3.0;
        for k in 0..BLUE_GAP_LEN {
            assert_relative_eq!(
                full.band(k)[[0, 0]],
                baseline + slope * (w[BLUE_GAP_LEN] - w[k]),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_red_gap_value_formula() {
        let axis = test_axis(50);
        let measured = sloped_cube(50, 1, 1);
        let full = reconstruct_gaps(&measured, &axis).unwrap();
        let w = axis.wavelengths();
        // blue-extended index e is measured band e - 9
        let e = |b: usize| measured.band(b - BLUE_GAP_LEN)[[0, 0]];

        let slope = ((e(37) - e(40)) / (w[50] - w[39])
            + (e(38) - e(41)) / (w[51] - w[38])
            + (e(39) - e(42)) / (w[52] - w[37]))
            / 3.0;
        for k in RED_GAP_START..RED_GAP_START + RED_GAP_LEN {
            assert_relative_eq!(
                full.band(k)[[0, 0]],
                e(39) + slope * (w[k] - w[39]),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_reconstruction_is_idempotent() {
        let axis = test_axis(70);
        let measured = sloped_cube(70, 4, 5);
        let first = reconstruct_gaps(&measured, &axis).unwrap();
        let again = reconstruct_gaps(&strip_gaps(&first).unwrap(), &axis).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_strip_returns_measured_bands() {
        let axis = test_axis(45);
        let measured = sloped_cube(45, 2, 2);
        let full = reconstruct_gaps(&measured, &axis).unwrap();
        assert_eq!(strip_gaps(&full).unwrap(), measured);
    }

    #[test]
    fn test_band_count_must_match_axis() {
        let axis = test_axis(60);
        let measured = sloped_cube(59, 1, 1);
        assert!(matches!(
            reconstruct_gaps(&measured, &axis),
            Err(PipelineError::BandCountMismatch { expected: 60, found: 59 })
        ));
    }

    #[test]
    fn test_too_few_measured_bands() {
        let axis = test_axis(33);
        let measured = sloped_cube(33, 1, 1);
        assert!(matches!(
            reconstruct_gaps(&measured, &axis),
            Err(PipelineError::BandCountMismatch { expected: 34, .. })
        ));
    }
}
