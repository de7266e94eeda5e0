//! Flat-field calibration.
//!
//! Map-projected VNIR reflectance of a white surface droops by a factor of
//! two to three towards the short-wavelength end. A reflectance spectrum of a
//! surface known to be flat (polar snow) gives one multiplicative factor per
//! band that lifts the droop back to the spectrum's maximum.
//!
//! The correction is approximate; it moves the output in the right direction
//! without claiming photometric accuracy.

use std::path::Path;

use tracing::debug;

use crate::spectral_pipeline::bands::find_band;
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::cube::ReflectanceCube;
use crate::spectral_pipeline::tables::{Delimiter, read_table};

/// Columns of the calibration table holding band wavelength and reflectance.
const WAVELENGTH_COLUMN: usize = 1;
const REFLECTANCE_COLUMN: usize = 2;

/// Wavelength at which each working band looks up its calibration entry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CalibrationLookup {
    /// The band's own centre wavelength.
    #[default]
    BandCenters,
    /// `start + index * step`, independent of the band centres.
    NominalGrid { start: f64, step: f64 },
}

impl CalibrationLookup {
    /// 380 nm in 5 nm steps, the grid the white-flat table was first
    /// quantised to.
    pub const REFERENCE_GRID: Self = CalibrationLookup::NominalGrid {
        start: 380.0,
        step: 5.0,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSpectrum {
    wavelengths: Vec<f64>,
    reflectance: Vec<f64>,
}

impl CalibrationSpectrum {
    pub fn new(wavelengths: Vec<f64>, reflectance: Vec<f64>) -> Result<Self> {
        if wavelengths.len() != reflectance.len() {
            return Err(PipelineError::BandCountMismatch {
                expected: wavelengths.len(),
                found: reflectance.len(),
            });
        }
        if wavelengths.is_empty() {
            return Err(PipelineError::DegenerateCalibration(
                "spectrum has no entries".to_string(),
            ));
        }
        Ok(Self {
            wavelengths,
            reflectance,
        })
    }

    /// Loads a comma-delimited white-flat export; columns 1 and 2 hold
    /// wavelength and reflectance.
    pub fn from_table<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let rows = read_table(path, Delimiter::Comma)?;
        let mut wavelengths = Vec::with_capacity(rows.len());
        let mut reflectance = Vec::with_capacity(rows.len());
        for (row, values) in rows.iter().enumerate() {
            match (values.get(WAVELENGTH_COLUMN), values.get(REFLECTANCE_COLUMN)) {
                (Some(&w), Some(&r)) => {
                    wavelengths.push(w);
                    reflectance.push(r);
                }
                _ => {
                    return Err(PipelineError::TableParseError {
                        path: path.display().to_string(),
                        row,
                        reason: format!("expected at least {} columns", REFLECTANCE_COLUMN + 1),
                    });
                }
            }
        }
        Self::new(wavelengths, reflectance)
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn reflectance(&self) -> &[f64] {
        &self.reflectance
    }

    /// One factor per working band: the largest looked-up calibration value
    /// divided by the band's own looked-up value.
    pub fn correction_factors(
        &self,
        band_wavelengths: &[f64],
        lookup: CalibrationLookup,
    ) -> Result<Vec<f64>> {
        let looked_up: Vec<f64> = band_wavelengths
            .iter()
            .enumerate()
            .map(|(index, &centre)| {
                let wavelength = match lookup {
                    CalibrationLookup::BandCenters => centre,
                    CalibrationLookup::NominalGrid { start, step } => start + index as f64 * step,
                };
                self.reflectance[find_band(&self.wavelengths, wavelength)]
            })
            .collect();

        if let Some(bad) = looked_up.iter().find(|v| **v <= 0.0 || !v.is_finite()) {
            return Err(PipelineError::DegenerateCalibration(format!(
                "reflectance {} cannot scale a band",
                bad
            )));
        }
        let maximum = looked_up.iter().copied().fold(0.0, f64::max);
        debug!(bands = looked_up.len(), maximum, "Derived calibration factors");

        Ok(looked_up.iter().map(|value| maximum / value).collect())
    }

    /// Scales each band of `cube` by its correction factor.
    pub fn apply(
        &self,
        cube: ReflectanceCube,
        band_wavelengths: &[f64],
        lookup: CalibrationLookup,
    ) -> Result<ReflectanceCube> {
        let factors = self.correction_factors(band_wavelengths, lookup)?;
        cube.scale_bands(&factors)
    }
}
