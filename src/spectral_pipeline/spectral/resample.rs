//! Flux-conserving spectral resampling.
//!
//! Each sample is treated as a histogram bin whose edges sit halfway to its
//! neighbours. A target bin takes the width-weighted mean of the source bins
//! it overlaps, with partial overlaps weighted by their covered fraction.

/// Bin edges for sample centres; the outer edges mirror the first and last
/// half-spacings.
fn bin_edges(centres: &[f64]) -> Vec<f64> {
    let n = centres.len();
    let mut edges = Vec::with_capacity(n + 1);
    edges.push(centres[0] - (centres[1] - centres[0]) / 2.0);
    edges.extend(centres.windows(2).map(|pair| (pair[0] + pair[1]) / 2.0));
    edges.push(centres[n - 1] + (centres[n - 1] - centres[n - 2]) / 2.0);
    edges
}

/// Resamples `source_values` defined at `source_centres` onto
/// `target_centres`. Target bins not fully covered by the source take `fill`.
/// Both grids must be increasing; grids with fewer than two points cannot
/// form bins and resample entirely to `fill`.
pub fn resample_flux(
    target_centres: &[f64],
    source_centres: &[f64],
    source_values: &[f64],
    fill: f64,
) -> Vec<f64> {
    if target_centres.len() < 2 || source_centres.len() < 2 {
        return vec![fill; target_centres.len()];
    }

    let source_edges = bin_edges(source_centres);
    let source_widths: Vec<f64> = source_edges.windows(2).map(|e| e[1] - e[0]).collect();
    let target_edges = bin_edges(target_centres);
    let last_edge = source_edges[source_edges.len() - 1];

    let mut start = 0;
    let mut stop = 0;
    let mut resampled = Vec::with_capacity(target_centres.len());

    for bin in target_edges.windows(2) {
        let (low, high) = (bin[0], bin[1]);
        if low < source_edges[0] || high > last_edge {
            resampled.push(fill);
            continue;
        }

        while source_edges[start + 1] <= low {
            start += 1;
        }
        while source_edges[stop + 1] < high {
            stop += 1;
        }

        if start == stop {
            resampled.push(source_values[start]);
            continue;
        }

        let start_factor =
            (source_edges[start + 1] - low) / (source_edges[start + 1] - source_edges[start]);
        let end_factor = (high - source_edges[stop]) / (source_edges[stop + 1] - source_edges[stop]);

        let mut weighted = 0.0;
        let mut total_width = 0.0;
        for i in start..=stop {
            let width = if i == start {
                source_widths[i] * start_factor
            } else if i == stop {
                source_widths[i] * end_factor
            } else {
                source_widths[i]
            };
            weighted += width * source_values[i];
            total_width += width;
        }
        resampled.push(weighted / total_width);
    }
    resampled
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_grid() {
        let grid = [400.0, 405.0, 410.0, 415.0];
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(resample_flux(&grid, &grid, &values, 0.0), values.to_vec());
    }

    #[test]
    fn test_constant_spectrum_is_preserved() {
        let source: Vec<f64> = (0..81).map(|i| 380.0 + 5.0 * i as f64).collect();
        let values = vec![0.7; 81];
        let target: Vec<f64> = (0..40).map(|i| 390.0 + 6.55 * i as f64).collect();
        for value in resample_flux(&target, &source, &values, 0.0) {
            assert_relative_eq!(value, 0.7, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_coarse_bins_average_fine_bins() {
        let source = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let values = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        // target bins [1.5, 3.5] and [3.5, 5.5] each cover two whole source bins
        let target = [2.5, 4.5];
        let resampled = resample_flux(&target, &source, &values, -1.0);
        assert_relative_eq!(resampled[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(resampled[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_uncovered_bins_take_fill() {
        let source = [500.0, 510.0, 520.0];
        let values = [1.0, 1.0, 1.0];
        let target = [480.0, 490.0, 500.0, 510.0, 520.0, 530.0];
        let resampled = resample_flux(&target, &source, &values, 0.0);
        assert_eq!(resampled, vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_single_point_grid_fills() {
        assert_eq!(resample_flux(&[500.0], &[400.0, 600.0], &[1.0, 1.0], 0.0), vec![0.0]);
    }
}
