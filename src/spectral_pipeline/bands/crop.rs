use tracing::debug;

use crate::spectral_pipeline::bands::axis::BandAxis;
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::cube::ReflectanceCube;

/// Copies out the bands between the axis entries nearest `low` and `high`,
/// half-open at the high end. A degenerate window yields zero bands; callers
/// decide whether that is acceptable.
pub fn crop_bands(
    cube: &ReflectanceCube,
    axis: &BandAxis,
    low: f64,
    high: f64,
) -> Result<ReflectanceCube> {
    if cube.bands() != axis.len() {
        return Err(PipelineError::BandCountMismatch {
            expected: axis.len(),
            found: cube.bands(),
        });
    }
    let window = axis.window(low, high);
    debug!(low, high, start = window.start, end = window.end, "Cropping cube");
    Ok(cube.slice_bands(window.range()))
}
