//! Spectral reconstruction pipeline module
//!
//! Turns map-projected CRISM reflectance cubes into perceptual colour images
//! and into simulations of other cameras' filter sets. Stages are split into
//! band-grid handling, spectral weighting, colorimetry, normalisation and
//! TIFF output, composed by the conversions module.

pub mod bands;
pub mod colour;
pub mod common;
pub mod conversions;
pub mod cube;
pub mod normalize;
pub mod spectral;
pub mod tables;
pub mod tiff;

#[cfg(test)]
pub(crate) mod test_support;

pub use common::{PipelineError, Result};

pub use bands::{BandAxis, BandWindow, crop_bands, find_band, reconstruct_gaps};

pub use cube::{CubeReader, Pds3CubeReader, ReflectanceCube};

pub use spectral::{CalibrationLookup, CalibrationSpectrum, MatchingFunction, integrate_filter};

pub use colour::{ColourSystem, Illuminant, NamedColourSystem, SpectralConverter};

pub use normalize::{Stretch, StretchMode, quantize_u16};

pub use tables::{FilterTable, ReferenceData, ReferenceTables};

pub use tiff::{OutputImage, StandardTiffWriter, TiffCompression, TiffConfig, TiffWriter};

pub use conversions::{
    Camera, CameraPipeline, CameraRequest, ColorConfig, ColorPipeline, ConversionReport, LuminanceWeighting,
    WavelengthWindow, WindowRequest,
};
