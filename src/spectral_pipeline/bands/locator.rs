use std::ops::Range;

/// Index of the wavelength closest to `target`. Ties resolve to the lowest
/// index. An empty slice yields 0.
pub fn find_band(wavelengths: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, &wavelength) in wavelengths.iter().enumerate() {
        let distance = (wavelength - target).abs();
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

/// Half-open band index range `[start, end)` located from a wavelength pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandWindow {
    pub start: usize,
    pub end: usize,
}

impl BandWindow {
    pub fn locate(wavelengths: &[f64], low: f64, high: f64) -> Self {
        Self {
            start: find_band(wavelengths, low),
            end: find_band(wavelengths, high),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end.max(self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AXIS: [f64; 5] = [400.0, 410.0, 420.0, 430.0, 440.0];

    #[test]
    fn test_exact_wavelengths_map_to_their_index() {
        for (index, &wavelength) in AXIS.iter().enumerate() {
            assert_eq!(find_band(&AXIS, wavelength), index);
        }
    }

    #[test]
    fn test_midpoint_resolves_to_lower_index() {
        assert_eq!(find_band(&AXIS, 405.0), 0);
        assert_eq!(find_band(&AXIS, 435.0), 3);
    }

    #[test]
    fn test_out_of_range_targets_clamp_to_ends() {
        assert_eq!(find_band(&AXIS, 100.0), 0);
        assert_eq!(find_band(&AXIS, 9000.0), 4);
    }

    #[test]
    fn test_window_locate() {
        let window = BandWindow::locate(&AXIS, 409.0, 431.0);
        assert_eq!(window, BandWindow { start: 1, end: 3 });
        assert_eq!(window.len(), 2);
        assert_eq!(window.range(), 1..3);
    }

    #[test]
    fn test_degenerate_window_is_empty() {
        let window = BandWindow::locate(&AXIS, 420.0, 421.0);
        assert!(window.is_empty());
        let reversed = BandWindow::locate(&AXIS, 440.0, 400.0);
        assert!(reversed.is_empty());
        assert_eq!(reversed.range(), 4..4);
    }
}
