//! Filter integration.
//!
//! A filter image is the transmission-weighted mean of the cube's bands.
//! Filters of different widths integrate to different levels purely from
//! their width, so every result is shifted so that its mean matches the mean
//! reflectance inside the filter's own significant passband.

use ndarray::{Array2, Axis};
use tracing::trace;

use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::cube::ReflectanceCube;

/// Minimum weight of a band inside the significant passband.
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Applied to the threshold test only when the peak weight is below the
/// threshold, so that low-transmission filters still have a passband.
const LOW_TRANSMISSION_BOOST: f64 = 100.0;

/// Half-open band range `[short, long)` where a filter transmits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignificantWindow {
    pub short: usize,
    pub long: usize,
}

impl SignificantWindow {
    /// Spans the first through last significant band; the end is exclusive
    /// unless only one band is significant, in which case it is widened by
    /// one so the window is never empty.
    pub fn from_weights(weights: &[f64]) -> Option<Self> {
        let peak = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let boost = if peak < SIGNIFICANCE_THRESHOLD {
            LOW_TRANSMISSION_BOOST
        } else {
            1.0
        };
        let significant = |w: &f64| w * boost >= SIGNIFICANCE_THRESHOLD;

        let short = weights.iter().position(significant)?;
        let mut long = weights.iter().rposition(significant)?;
        if short == long {
            long += 1;
        }
        Some(Self { short, long })
    }
}

/// Integrates `cube` through a filter with per-band `weights`.
pub fn integrate_filter(weights: &[f64], cube: &ReflectanceCube) -> Result<Array2<f64>> {
    if weights.len() != cube.bands() {
        return Err(PipelineError::BandCountMismatch {
            expected: cube.bands(),
            found: weights.len(),
        });
    }
    let window = SignificantWindow::from_weights(weights).ok_or_else(|| {
        PipelineError::DegenerateFilter(format!(
            "no weight reaches {} across {} bands",
            SIGNIFICANCE_THRESHOLD,
            weights.len()
        ))
    })?;

    let total: f64 = weights.iter().sum();
    let normalized: Vec<f64> = weights.iter().map(|w| w / total).collect();
    let normalized_total: f64 = normalized.iter().sum();

    let mut image = cube.empty_plane();
    for (band, &weight) in cube.data().axis_iter(Axis(0)).zip(&normalized) {
        image.scaled_add(weight, &band);
    }
    image /= normalized_total;

    let passband_mean = cube.mean_over_bands(window.short..window.long);
    let offset = passband_mean - image.mean().unwrap_or(f64::NAN);
    trace!(short = window.short, long = window.long, offset, "Integrated filter");
    image += offset;

    Ok(image)
}
