//! Contrast stretching and 16-bit quantisation.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array3, ArrayBase, Axis, Data, DataMut, Ix3, Zip};

/// Relative headroom kept above the maximum and below the minimum when
/// stretching luminance and camera composites.
pub const DEFAULT_HEADROOM: f64 = 0.02;

/// How the channels of a multi-channel image share their stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StretchMode {
    /// One min/max across every channel; keeps relative channel balance.
    #[default]
    Joint,
    /// Each channel stretched on its own; acts as a crude white balance.
    Independent,
}

impl FromStr for StretchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" | "joint" => Ok(StretchMode::Joint),
            "wb" | "independent" => Ok(StretchMode::Independent),
            other => Err(format!("unknown stretch mode '{}', use raw or wb", other)),
        }
    }
}

impl fmt::Display for StretchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StretchMode::Joint => f.write_str("raw"),
            StretchMode::Independent => f.write_str("wb"),
        }
    }
}

/// Linear stretch `(x - (min - h*min)) / (max + h*max)` with headroom `h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stretch {
    pub mode: StretchMode,
    pub headroom: f64,
}

impl Default for Stretch {
    fn default() -> Self {
        Self {
            mode: StretchMode::Joint,
            headroom: DEFAULT_HEADROOM,
        }
    }
}

impl Stretch {
    pub fn new(mode: StretchMode, headroom: f64) -> Self {
        Self { mode, headroom }
    }

    pub fn joint(headroom: f64) -> Self {
        Self::new(StretchMode::Joint, headroom)
    }

    /// Stretches a `(channel, row, col)` array in place.
    ///
    /// A channel set whose maximum is zero is left untouched.
    pub fn apply_inplace<S>(&self, image: &mut ArrayBase<S, Ix3>)
    where
        S: DataMut<Elem = f64>,
    {
        match self.mode {
            StretchMode::Joint => {
                let (min, max) = extrema(image.iter().copied());
                self.stretch_values(image.iter_mut(), min, max);
            }
            StretchMode::Independent => {
                for mut channel in image.axis_iter_mut(Axis(0)) {
                    let (min, max) = extrema(channel.iter().copied());
                    self.stretch_values(channel.iter_mut(), min, max);
                }
            }
        }
    }

    pub fn apply<S>(&self, image: &ArrayBase<S, Ix3>) -> Array3<f64>
    where
        S: Data<Elem = f64>,
    {
        let mut out = image.to_owned();
        self.apply_inplace(&mut out);
        out
    }

    fn stretch_values<'a>(&self, values: impl Iterator<Item = &'a mut f64>, min: f64, max: f64) {
        let scale = max + self.headroom * max;
        if scale == 0.0 || !scale.is_finite() {
            return;
        }
        let floor = min - self.headroom * min;
        for value in values {
            *value = (*value - floor) / scale;
        }
    }
}

fn extrema(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
        (min.min(v), max.max(v))
    })
}

/// Maps `[0, 1]` to `[0, 65535]`. Fractions are truncated and anything
/// outside the range saturates.
pub fn quantize_u16<S>(image: &ArrayBase<S, Ix3>) -> Array3<u16>
where
    S: Data<Elem = f64>,
{
    let mut out = Array3::zeros(image.raw_dim());
    Zip::from(&mut out)
        .and(image)
        .par_for_each(|q, &v| *q = (v * u16::MAX as f64) as u16);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_joint_stretch_bounds() {
        let image = array![[[0.2, 0.4]], [[0.6, 0.8]], [[0.3, 0.5]]];
        let out = Stretch::default().apply(&image);
        let (min, max) = extrema(out.iter().copied());
        assert!(min >= 0.0 && max <= 1.0);
        assert_relative_eq!(max, (0.8 - 0.196) / 0.816, epsilon = 1e-12);
        assert_relative_eq!(min, (0.2 - 0.196) / 0.816, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_headroom_matches_min_over_max() {
        let image = array![[[0.25, 0.5]], [[0.75, 1.0]]];
        let out = Stretch::joint(0.0).apply(&image);
        assert_relative_eq!(out[[0, 0, 0]], 0.0);
        assert_relative_eq!(out[[1, 0, 1]], 0.75);
    }

    #[test]
    fn test_joint_keeps_channel_ratios_of_offsets() {
        let image = array![[[0.1, 0.3]], [[0.2, 0.5]]];
        let out = Stretch::joint(0.0).apply(&image);
        // a single affine map is applied to every channel
        let slope = (out[[1, 0, 1]] - out[[0, 0, 0]]) / (0.5 - 0.1);
        assert_relative_eq!(out[[0, 0, 1]] - out[[0, 0, 0]], slope * 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_independent_stretch_per_channel() {
        let image = array![[[0.1, 0.2]], [[0.4, 0.8]]];
        let out = Stretch::new(StretchMode::Independent, 0.0).apply(&image);
        assert_relative_eq!(out[[0, 0, 1]], (0.2 - 0.1) / 0.2);
        assert_relative_eq!(out[[1, 0, 1]], (0.8 - 0.4) / 0.8);
    }

    #[test]
    fn test_all_zero_image_is_left_alone() {
        let image = Array3::<f64>::zeros((3, 2, 2));
        let out = Stretch::default().apply(&image);
        assert!(out.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_quantize_endpoints_and_saturation() {
        let image = array![[[0.0, 1.0, 0.5, 1.5, -0.2]]];
        let q = quantize_u16(&image);
        assert_eq!(q[[0, 0, 0]], 0);
        assert_eq!(q[[0, 0, 1]], 65535);
        assert_eq!(q[[0, 0, 2]], 32767);
        assert_eq!(q[[0, 0, 3]], 65535);
        assert_eq!(q[[0, 0, 4]], 0);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("raw".parse::<StretchMode>(), Ok(StretchMode::Joint));
        assert_eq!("WB".parse::<StretchMode>(), Ok(StretchMode::Independent));
        assert!("auto".parse::<StretchMode>().is_err());
        assert_eq!(StretchMode::Independent.to_string(), "wb");
    }
}
