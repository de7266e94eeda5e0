use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use crate::spectral_pipeline::common::error::{PipelineError, Result};

/// Determinants below this mean the primaries are collinear.
const SINGULAR_DETERMINANT: f64 = 1e-12;

/// CIE xy chromaticity coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
}

impl Chromaticity {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// `(x, y, 1 - x - y)`
    pub fn xyz(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, 1.0 - self.x - self.y)
    }
}

pub const ILLUMINANT_D50: Chromaticity = Chromaticity::new(0.3457, 0.3585);
/// Default white point; closer to typical displays than D65.
pub const ILLUMINANT_D55: Chromaticity = Chromaticity::new(0.3324, 0.3474);
pub const ILLUMINANT_D65: Chromaticity = Chromaticity::new(0.3127, 0.3291);
pub const ILLUMINANT_D75: Chromaticity = Chromaticity::new(0.2990, 0.3149);

/// Standard daylight white points selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Illuminant {
    D50,
    #[default]
    D55,
    D65,
    D75,
}

impl Illuminant {
    pub fn chromaticity(&self) -> Chromaticity {
        match self {
            Illuminant::D50 => ILLUMINANT_D50,
            Illuminant::D55 => ILLUMINANT_D55,
            Illuminant::D65 => ILLUMINANT_D65,
            Illuminant::D75 => ILLUMINANT_D75,
        }
    }
}

impl FromStr for Illuminant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "d50" => Ok(Illuminant::D50),
            "d55" => Ok(Illuminant::D55),
            "d65" => Ok(Illuminant::D65),
            "d75" => Ok(Illuminant::D75),
            other => Err(format!("unknown white point '{}', use d50, d55, d65 or d75", other)),
        }
    }
}

impl fmt::Display for Illuminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Illuminant::D50 => "d50",
            Illuminant::D55 => "d55",
            Illuminant::D65 => "d65",
            Illuminant::D75 => "d75",
        };
        f.write_str(name)
    }
}

/// Display primaries with a known name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamedColourSystem {
    #[default]
    Srgb,
    Hdtv,
    Smpte,
}

impl NamedColourSystem {
    /// Red, green and blue primaries.
    pub fn primaries(&self) -> [Chromaticity; 3] {
        match self {
            NamedColourSystem::Srgb => [
                Chromaticity::new(0.64, 0.33),
                Chromaticity::new(0.30, 0.60),
                Chromaticity::new(0.15, 0.06),
            ],
            NamedColourSystem::Hdtv => [
                Chromaticity::new(0.67, 0.33),
                Chromaticity::new(0.21, 0.71),
                Chromaticity::new(0.15, 0.06),
            ],
            NamedColourSystem::Smpte => [
                Chromaticity::new(0.63, 0.34),
                Chromaticity::new(0.31, 0.595),
                Chromaticity::new(0.155, 0.070),
            ],
        }
    }
}

impl FromStr for NamedColourSystem {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "srgb" => Ok(NamedColourSystem::Srgb),
            "hdtv" => Ok(NamedColourSystem::Hdtv),
            "smpte" => Ok(NamedColourSystem::Smpte),
            other => Err(format!("unknown colour system '{}', use srgb, hdtv or smpte", other)),
        }
    }
}

impl fmt::Display for NamedColourSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NamedColourSystem::Srgb => "srgb",
            NamedColourSystem::Hdtv => "hdtv",
            NamedColourSystem::Smpte => "smpte",
        };
        f.write_str(name)
    }
}

/// An RGB colour system defined by its primaries and white point.
#[derive(Debug, Clone, PartialEq)]
pub struct ColourSystem {
    /// Columns are the primaries' `(x, y, z)`; maps RGB to XYZ.
    primaries: Matrix3<f64>,
    /// Inverse of `primaries` with each row divided by the white scaling, so
    /// the white point maps to `(1, 1, 1)`.
    xyz_to_rgb: Matrix3<f64>,
}

impl ColourSystem {
    pub fn new(
        red: Chromaticity,
        green: Chromaticity,
        blue: Chromaticity,
        white: Chromaticity,
    ) -> Result<Self> {
        let primaries = Matrix3::from_columns(&[red.xyz(), green.xyz(), blue.xyz()]);
        if primaries.determinant().abs() < SINGULAR_DETERMINANT {
            return Err(PipelineError::SingularPrimaries);
        }
        let inverse = primaries
            .try_inverse()
            .ok_or(PipelineError::SingularPrimaries)?;
        let white_scale = inverse * white.xyz();
        let xyz_to_rgb = Matrix3::from_fn(|row, col| inverse[(row, col)] / white_scale[row]);

        debug!(?white, "Built colour system");
        Ok(Self {
            primaries,
            xyz_to_rgb,
        })
    }

    pub fn named(system: NamedColourSystem, white: Chromaticity) -> Result<Self> {
        let [red, green, blue] = system.primaries();
        Self::new(red, green, blue, white)
    }

    pub fn primaries(&self) -> &Matrix3<f64> {
        &self.primaries
    }

    pub fn xyz_to_rgb_matrix(&self) -> &Matrix3<f64> {
        &self.xyz_to_rgb
    }

    /// Converts XYZ to RGB. Out-of-gamut results are pulled in by adding the
    /// most negative component's magnitude to every channel; the result is
    /// not renormalised, so brightness stays comparable between pixels.
    pub fn xyz_to_rgb(&self, xyz: &Vector3<f64>) -> Vector3<f64> {
        let mut rgb = self.xyz_to_rgb * xyz;
        let min = rgb.min();
        if min < 0.0 {
            rgb.add_scalar_mut(-min);
        }
        rgb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_white_point_maps_to_unit_rgb() {
        for named in [NamedColourSystem::Srgb, NamedColourSystem::Hdtv, NamedColourSystem::Smpte] {
            for white in [ILLUMINANT_D50, ILLUMINANT_D55, ILLUMINANT_D65, ILLUMINANT_D75] {
                let system = ColourSystem::named(named, white).unwrap();
                let rgb = system.xyz_to_rgb(&white.xyz());
                assert_relative_eq!(rgb, Vector3::new(1.0, 1.0, 1.0), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_primaries_map_to_single_channels() {
        let system = ColourSystem::named(NamedColourSystem::Srgb, ILLUMINANT_D65).unwrap();
        let [red, _, _] = NamedColourSystem::Srgb.primaries();
        let rgb = system.xyz_to_rgb(&red.xyz());
        assert!(rgb.x > 0.0);
        assert_relative_eq!(rgb.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(rgb.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_collinear_primaries_are_rejected() {
        let result = ColourSystem::new(
            Chromaticity::new(0.2, 0.2),
            Chromaticity::new(0.3, 0.3),
            Chromaticity::new(0.4, 0.4),
            ILLUMINANT_D55,
        );
        assert!(matches!(result, Err(PipelineError::SingularPrimaries)));
    }

    #[test]
    fn test_out_of_gamut_is_desaturated_uniformly() {
        let system = ColourSystem::named(NamedColourSystem::Srgb, ILLUMINANT_D55).unwrap();
        // spectral green near 520 nm lies far outside the sRGB triangle
        let xyz = Chromaticity::new(0.0743, 0.8338).xyz();
        let raw = system.xyz_to_rgb_matrix() * xyz;
        assert!(raw.min() < 0.0);

        let rgb = system.xyz_to_rgb(&xyz);
        assert!(rgb.iter().all(|c| *c >= 0.0));
        assert_relative_eq!(rgb.min(), 0.0, epsilon = 1e-15);
        let shift = rgb - raw;
        assert_relative_eq!(shift.x, shift.y, epsilon = 1e-12);
        assert_relative_eq!(shift.y, shift.z, epsilon = 1e-12);
        // ordering survives a uniform shift
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(raw[i] < raw[j], rgb[i] < rgb[j]);
            }
        }
    }

    #[test]
    fn test_in_gamut_is_untouched() {
        let system = ColourSystem::named(NamedColourSystem::Srgb, ILLUMINANT_D55).unwrap();
        let xyz = Chromaticity::new(0.35, 0.35).xyz();
        assert_eq!(system.xyz_to_rgb(&xyz), system.xyz_to_rgb_matrix() * xyz);
    }

    #[test]
    fn test_illuminant_parsing() {
        assert_eq!("D65".parse::<Illuminant>(), Ok(Illuminant::D65));
        assert_eq!("d50".parse::<Illuminant>().map(|w| w.chromaticity()), Ok(ILLUMINANT_D50));
        assert_eq!(Illuminant::default().chromaticity(), ILLUMINANT_D55);
        assert_eq!(Illuminant::D75.to_string(), "d75");
        assert!("e".parse::<Illuminant>().is_err());
    }

    #[test]
    fn test_named_system_parsing() {
        assert_eq!("sRGB".parse::<NamedColourSystem>(), Ok(NamedColourSystem::Srgb));
        assert_eq!("smpte".parse::<NamedColourSystem>(), Ok(NamedColourSystem::Smpte));
        assert!("adobe".parse::<NamedColourSystem>().is_err());
        assert_eq!(NamedColourSystem::Hdtv.to_string(), "hdtv");
    }
}
