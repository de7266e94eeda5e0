use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array2, Array3};
use rayon::prelude::*;
use tracing::{info, info_span, instrument};

use super::run::{ConversionReport, output_path, prepare_cube, write_output};
use crate::spectral_pipeline::bands::crop_bands;
use crate::spectral_pipeline::colour::system::ILLUMINANT_D55;
use crate::spectral_pipeline::colour::{Chromaticity, ColourSystem, NamedColourSystem, SpectralConverter};
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::cube::{CubeReader, Pds3CubeReader, ReflectanceCube};
use crate::spectral_pipeline::normalize::{DEFAULT_HEADROOM, Stretch, StretchMode, quantize_u16};
use crate::spectral_pipeline::spectral::{CalibrationLookup, integrate_filter};
use crate::spectral_pipeline::tables::ReferenceData;
use crate::spectral_pipeline::tiff::{OutputImage, StandardTiffWriter, TiffConfig, TiffWriter};

/// Weights used for the three luminance images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LuminanceWeighting {
    /// Uniform weights; the three luminance channels come out identical.
    #[default]
    Flat,
    /// The remapped matching function, one column per channel.
    Tristimulus,
}

impl FromStr for LuminanceWeighting {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(LuminanceWeighting::Flat),
            "tristimulus" | "cmf" => Ok(LuminanceWeighting::Tristimulus),
            other => Err(format!("unknown weighting '{}', use flat or tristimulus", other)),
        }
    }
}

/// Settings for spectral colour reconstruction
#[derive(Debug, Clone)]
pub struct ColorConfig {
    /// Chromaticity stretch: joint ("raw") or per channel ("wb")
    pub mode: StretchMode,
    pub weighting: LuminanceWeighting,
    pub colour_system: NamedColourSystem,
    pub white_point: Chromaticity,
    pub calibration_lookup: CalibrationLookup,
    /// Headroom of the chromaticity stretch; zero stretches `(x - min) / max`
    pub chroma_headroom: f64,
    pub luminance_headroom: f64,
    pub tiff: TiffConfig,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            mode: StretchMode::Joint,
            weighting: LuminanceWeighting::Flat,
            colour_system: NamedColourSystem::Srgb,
            white_point: ILLUMINANT_D55,
            calibration_lookup: CalibrationLookup::BandCenters,
            chroma_headroom: 0.0,
            luminance_headroom: DEFAULT_HEADROOM,
            tiff: TiffConfig::default(),
        }
    }
}

impl ColorConfig {
    pub fn builder() -> ColorConfigBuilder {
        ColorConfigBuilder::default()
    }
}

/// Builder for ColorConfig
#[derive(Default)]
pub struct ColorConfigBuilder {
    mode: Option<StretchMode>,
    weighting: Option<LuminanceWeighting>,
    colour_system: Option<NamedColourSystem>,
    white_point: Option<Chromaticity>,
    calibration_lookup: Option<CalibrationLookup>,
    chroma_headroom: Option<f64>,
    luminance_headroom: Option<f64>,
    tiff: Option<TiffConfig>,
}

impl ColorConfigBuilder {
    pub fn mode(mut self, mode: StretchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn weighting(mut self, weighting: LuminanceWeighting) -> Self {
        self.weighting = Some(weighting);
        self
    }

    pub fn colour_system(mut self, system: NamedColourSystem) -> Self {
        self.colour_system = Some(system);
        self
    }

    pub fn white_point(mut self, white: Chromaticity) -> Self {
        self.white_point = Some(white);
        self
    }

    pub fn calibration_lookup(mut self, lookup: CalibrationLookup) -> Self {
        self.calibration_lookup = Some(lookup);
        self
    }

    pub fn chroma_headroom(mut self, headroom: f64) -> Self {
        self.chroma_headroom = Some(headroom);
        self
    }

    pub fn luminance_headroom(mut self, headroom: f64) -> Self {
        self.luminance_headroom = Some(headroom);
        self
    }

    pub fn tiff(mut self, tiff: TiffConfig) -> Self {
        self.tiff = Some(tiff);
        self
    }

    pub fn build(self) -> ColorConfig {
        let default = ColorConfig::default();
        ColorConfig {
            mode: self.mode.unwrap_or(default.mode),
            weighting: self.weighting.unwrap_or(default.weighting),
            colour_system: self.colour_system.unwrap_or(default.colour_system),
            white_point: self.white_point.unwrap_or(default.white_point),
            calibration_lookup: self.calibration_lookup.unwrap_or(default.calibration_lookup),
            chroma_headroom: self.chroma_headroom.unwrap_or(default.chroma_headroom),
            luminance_headroom: self.luminance_headroom.unwrap_or(default.luminance_headroom),
            tiff: self.tiff.unwrap_or(default.tiff),
        }
    }
}

/// Wavelength ranges summarised by the standard browse products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedWindow {
    /// Visible, 380-780 nm
    Vis,
    /// 1.01-2.60 µm
    Fal,
    /// Fe oxidation state and mineralogy, 750-1200 nm
    Fem,
    /// Primary basaltic minerals, 800-2000 nm
    Maf,
    /// Clay mineralogy, 1.8-2.3 µm
    Phy,
    /// Long-wave detector, 2.8-3.9 µm
    Far,
    /// Water and carbonate, 2.9-3.4 µm
    Car,
}

impl NamedWindow {
    pub const ALL: [NamedWindow; 7] = [
        NamedWindow::Vis,
        NamedWindow::Fal,
        NamedWindow::Fem,
        NamedWindow::Maf,
        NamedWindow::Phy,
        NamedWindow::Far,
        NamedWindow::Car,
    ];

    pub fn bounds(&self) -> (f64, f64) {
        match self {
            NamedWindow::Vis => (380.0, 780.0),
            NamedWindow::Fal => (1010.0, 2600.0),
            NamedWindow::Fem => (750.0, 1200.0),
            NamedWindow::Maf => (800.0, 2000.0),
            NamedWindow::Phy => (1800.0, 2300.0),
            NamedWindow::Far => (2800.0, 3900.0),
            NamedWindow::Car => (2900.0, 3400.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NamedWindow::Vis => "VIS",
            NamedWindow::Fal => "FAL",
            NamedWindow::Fem => "FEM",
            NamedWindow::Maf => "MAF",
            NamedWindow::Phy => "PHY",
            NamedWindow::Far => "FAR",
            NamedWindow::Car => "CAR",
        }
    }
}

impl FromStr for NamedWindow {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        NamedWindow::ALL
            .into_iter()
            .find(|w| w.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PipelineError::UnknownWindow(s.to_string()))
    }
}

/// A resolved wavelength window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WavelengthWindow {
    Named(NamedWindow),
    Custom { low: f64, high: f64 },
}

impl WavelengthWindow {
    pub fn custom(low: f64, high: f64) -> Result<Self> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(PipelineError::InvalidWindow(format!(
                "[{}, {}] is not an increasing wavelength pair",
                low, high
            )));
        }
        Ok(WavelengthWindow::Custom { low, high })
    }

    pub fn bounds(&self) -> (f64, f64) {
        match self {
            WavelengthWindow::Named(named) => named.bounds(),
            WavelengthWindow::Custom { low, high } => (*low, *high),
        }
    }

    /// Suffix of the output file name.
    pub fn label(&self) -> String {
        match self {
            WavelengthWindow::Named(named) => named.name().to_string(),
            WavelengthWindow::Custom { low, high } => format!("{}_{}", low, high),
        }
    }
}

impl fmt::Display for WavelengthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (low, high) = self.bounds();
        write!(f, "{} ({}-{} nm)", self.label(), low, high)
    }
}

/// A window as requested by the user, resolved only when it is rendered so
/// that one malformed request does not stop the others.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowRequest {
    Named(String),
    /// Comma-separated `LOW,HIGH` in nanometres
    Custom(String),
}

impl WindowRequest {
    pub fn resolve(&self) -> Result<WavelengthWindow> {
        match self {
            WindowRequest::Named(name) => name.parse().map(WavelengthWindow::Named),
            WindowRequest::Custom(pair) => {
                let values = pair
                    .split(',')
                    .map(|v| v.trim().parse::<f64>())
                    .collect::<std::result::Result<Vec<f64>, _>>()
                    .map_err(|_| PipelineError::InvalidWindow(format!("'{}' is not numeric", pair)))?;
                match values.as_slice() {
                    [low, high] => WavelengthWindow::custom(*low, *high),
                    _ => Err(PipelineError::InvalidWindow(format!(
                        "'{}' should be in the form LOW,HIGH",
                        pair
                    ))),
                }
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            WindowRequest::Named(name) => name,
            WindowRequest::Custom(pair) => pair,
        }
    }
}

/// Renders colour images of wavelength windows of a reflectance cube.
pub struct ColorPipeline<R: CubeReader, W: TiffWriter> {
    reader: R,
    writer: W,
    config: ColorConfig,
    references: ReferenceData,
    system: ColourSystem,
}

impl ColorPipeline<Pds3CubeReader, StandardTiffWriter> {
    pub fn new(config: ColorConfig, references: ReferenceData) -> Result<Self> {
        Self::with_custom(Pds3CubeReader, StandardTiffWriter, config, references)
    }
}

impl<R: CubeReader, W: TiffWriter> ColorPipeline<R, W> {
    pub fn with_custom(
        reader: R,
        writer: W,
        config: ColorConfig,
        references: ReferenceData,
    ) -> Result<Self> {
        let system = ColourSystem::named(config.colour_system, config.white_point)?;
        Ok(Self {
            reader,
            writer,
            config,
            references,
            system,
        })
    }

    /// Luminance images for `cube`, stacked `(channel, row, col)` and
    /// stretched jointly.
    fn luminance(&self, cube: &ReflectanceCube, cmf: &Array2<f64>) -> Result<Array3<f64>> {
        let weights: Vec<Vec<f64>> = match self.config.weighting {
            LuminanceWeighting::Flat => vec![vec![1.0; cube.bands()]; 3],
            LuminanceWeighting::Tristimulus => cmf.columns().into_iter().map(|c| c.to_vec()).collect(),
        };
        let images = weights
            .par_iter()
            .map(|w| integrate_filter(w, cube))
            .collect::<Result<Vec<_>>>()?;
        let mut luminance = Array3::zeros((3, cube.rows(), cube.cols()));
        for (mut plane, image) in luminance.outer_iter_mut().zip(&images) {
            plane.assign(image);
        }
        Stretch::joint(self.config.luminance_headroom).apply_inplace(&mut luminance);
        Ok(luminance)
    }

    /// Colour image of one window of a gap-filled cube.
    #[instrument(skip(self, cube, window), fields(window = %window))]
    pub fn render_window(&self, cube: &ReflectanceCube, window: &WavelengthWindow) -> Result<OutputImage> {
        let axis = &self.references.axis;
        let (low, high) = window.bounds();
        let bands = axis.window(low, high);
        if bands.is_empty() {
            return Err(PipelineError::InvalidWindow(format!("{} selects no bands", window)));
        }

        let cropped = {
            let _span = info_span!("crop", start = bands.start, end = bands.end).entered();
            crop_bands(cube, axis, low, high)?
        };
        let cmf = self.references.cmf.remap_window(axis, bands);

        let calibrated = {
            let _span = info_span!("calibrate").entered();
            self.references
                .calibration
                .apply(cropped, axis.slice(bands), self.config.calibration_lookup)?
        };

        let luminance = {
            let _span = info_span!("integrate").entered();
            self.luminance(&calibrated, &cmf)?
        };

        let mut rgb = {
            let _span = info_span!("colour_transform").entered();
            SpectralConverter::new(&self.system, cmf.view()).cube_to_rgb(&calibrated)?
        };
        Stretch::new(self.config.mode, self.config.chroma_headroom).apply_inplace(&mut rgb);
        rgb *= &luminance;

        OutputImage::from_planar(&quantize_u16(&rgb))
    }

    /// Renders every request over an already gap-filled cube, writing
    /// `<base>_<label>.tiff` for each.
    pub fn convert(
        &self,
        cube: &ReflectanceCube,
        requests: &[WindowRequest],
        base: &Path,
    ) -> Result<ConversionReport> {
        let mut report = ConversionReport::default();
        for request in requests {
            let rendered = request
                .resolve()
                .and_then(|window| Ok((window, self.render_window(cube, &window)?)));
            match rendered {
                Ok((window, image)) => {
                    let path = output_path(base, &window.label());
                    write_output(&self.writer, &image, &path, &self.config.tiff)?;
                    report.written.push(path);
                }
                Err(e) => report.reject(request.label(), e)?,
            }
        }
        Ok(report)
    }

    #[instrument(skip(self, input_path, base, requests))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        base: Q,
        requests: &[WindowRequest],
    ) -> Result<ConversionReport> {
        let input_path = input_path.as_ref();
        info!(
            input = %input_path.display(),
            requests = requests.len(),
            mode = %self.config.mode,
            "Converting cube to colour"
        );
        let cube = prepare_cube(&self.reader, input_path, &self.references.axis)?;
        self.convert(&cube, requests, base.as_ref())
    }

    pub fn config(&self) -> &ColorConfig {
        &self.config
    }

    pub fn references(&self) -> &ReferenceData {
        &self.references
    }
}
