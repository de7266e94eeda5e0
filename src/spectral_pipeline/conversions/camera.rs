use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{Array2, Array3, Axis};
use rayon::prelude::*;
use tracing::{debug, info, info_span, instrument};

use super::camera_profiles::{Camera, CameraProfile, ChannelSpec, Composite, FilterSource, FilterSpec};
use super::run::{ConversionReport, output_path, prepare_cube, write_output};
use crate::spectral_pipeline::bands::{BandAxis, crop_bands};
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::cube::{CubeReader, Pds3CubeReader, ReflectanceCube};
use crate::spectral_pipeline::normalize::{Stretch, quantize_u16};
use crate::spectral_pipeline::spectral::integrate_filter;
use crate::spectral_pipeline::tables::{FilterTable, ReferenceTables};
use crate::spectral_pipeline::tiff::{OutputImage, StandardTiffWriter, TiffConfig, TiffWriter};

/// What to render for one camera run. Unset fields fall back to the
/// camera's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraRequest {
    pub color: Option<String>,
    pub singles: Option<bool>,
}

type FilterImages = BTreeMap<&'static str, Array2<f64>>;

/// Simulates what another camera's filters would record of a reflectance
/// cube.
pub struct CameraPipeline<R: CubeReader, W: TiffWriter> {
    reader: R,
    writer: W,
    config: TiffConfig,
    axis: BandAxis,
    profile: &'static CameraProfile,
    filters: FilterTable,
}

impl CameraPipeline<Pds3CubeReader, StandardTiffWriter> {
    pub fn new(camera: Camera, tables: &ReferenceTables, config: TiffConfig) -> Result<Self> {
        let profile = camera.profile();
        let axis = BandAxis::from_table(&tables.band_axis)?;
        let filters = FilterTable::from_table(tables.filter_table(profile.filter_file))?;
        Ok(Self::with_custom(
            Pds3CubeReader,
            StandardTiffWriter,
            config,
            profile,
            axis,
            filters,
        ))
    }
}

impl<R: CubeReader, W: TiffWriter> CameraPipeline<R, W> {
    pub fn with_custom(
        reader: R,
        writer: W,
        config: TiffConfig,
        profile: &'static CameraProfile,
        axis: BandAxis,
        filters: FilterTable,
    ) -> Self {
        Self {
            reader,
            writer,
            config,
            axis,
            profile,
            filters,
        }
    }

    pub fn profile(&self) -> &'static CameraProfile {
        self.profile
    }

    /// Crops a gap-filled cube to the range the filter table is sampled on.
    pub fn crop(&self, cube: &ReflectanceCube) -> Result<ReflectanceCube> {
        let (low, high) = self.profile.crop;
        let _span = info_span!("crop", camera = self.profile.name).entered();
        let cropped = crop_bands(cube, &self.axis, low, high)?;
        if cropped.bands() != self.filters.bands() {
            return Err(PipelineError::BandCountMismatch {
                expected: cropped.bands(),
                found: self.filters.bands(),
            });
        }
        Ok(cropped)
    }

    /// Integrates the cropped cube through each named filter.
    pub fn filter_images(&self, cropped: &ReflectanceCube, names: &[&'static str]) -> Result<FilterImages> {
        let _span = info_span!("integrate", filters = names.len()).entered();
        let profile = self.profile;
        let filters = &self.filters;
        names
            .par_iter()
            .map(|&name| {
                let spec = profile.filter(name).ok_or_else(|| {
                    PipelineError::DegenerateFilter(format!("{} has no filter {}", profile.name, name))
                })?;
                let weights = transmission(filters, spec)?;
                integrate_filter(&weights, cropped)
                    .map_err(|e| match e {
                        PipelineError::DegenerateFilter(reason) => {
                            PipelineError::DegenerateFilter(format!("{}: {}", name, reason))
                        }
                        other => other,
                    })
                    .map(|image| (name, image))
            })
            .collect()
    }

    fn channel(
        &self,
        spec: &ChannelSpec,
        images: &FilterImages,
        cropped: &ReflectanceCube,
    ) -> Result<Array2<f64>> {
        let image = |name: &str| {
            images
                .get(name)
                .ok_or_else(|| PipelineError::DegenerateFilter(format!("{} was not integrated", name)))
        };
        match spec {
            ChannelSpec::Filter(name) => Ok(image(*name)?.clone()),
            ChannelSpec::Ratio(numerator, denominator) => Ok(image(*numerator)? / image(*denominator)?),
            ChannelSpec::Synthetic {
                terms,
                anchor_bands,
            } => {
                let mut sum = cropped.empty_plane();
                for (name, weight) in terms.iter() {
                    sum.scaled_add(*weight, image(*name)?);
                }
                let anchor = cropped.mean_over_bands(0..*anchor_bands);
                let shift = anchor - plane_mean(&sum);
                sum += shift;
                Ok(sum)
            }
        }
    }

    /// Colour composite from filter images, stretched jointly and quantised.
    pub fn render_composite(
        &self,
        composite: &Composite,
        images: &FilterImages,
        cropped: &ReflectanceCube,
    ) -> Result<OutputImage> {
        let mut channels = composite
            .channels
            .iter()
            .map(|spec| self.channel(spec, images, cropped))
            .collect::<Result<Vec<_>>>()?;

        if composite.balance_to_green {
            let green_mean = plane_mean(&channels[1]);
            for index in [0, 2] {
                let shift = green_mean - plane_mean(&channels[index]);
                channels[index] += shift;
            }
        }

        let mut stacked = Array3::zeros((3, cropped.rows(), cropped.cols()));
        for (mut plane, channel) in stacked.outer_iter_mut().zip(&channels) {
            plane.assign(channel);
        }
        Stretch::default().apply_inplace(&mut stacked);
        OutputImage::from_planar(&quantize_u16(&stacked))
    }

    /// Single filter image, quantised without stretching.
    pub fn render_single(&self, image: &Array2<f64>) -> Result<OutputImage> {
        let planar = image.view().insert_axis(Axis(0));
        OutputImage::from_planar(&quantize_u16(&planar))
    }

    /// Renders the requested composite and single-filter images of an
    /// already gap-filled cube.
    pub fn convert(
        &self,
        cube: &ReflectanceCube,
        request: &CameraRequest,
        base: &Path,
    ) -> Result<ConversionReport> {
        let mut report = ConversionReport::default();
        let keyword = request.color.as_deref().unwrap_or(self.profile.default_color);
        let composite = match self.profile.composite(keyword) {
            Some(composite) => Some(composite),
            None => {
                report.reject(
                    keyword,
                    PipelineError::InvalidColorKeyword {
                        keyword: keyword.to_string(),
                        expected: self.profile.keyword_list(),
                    },
                )?;
                None
            }
        };
        let singles: &[&'static str] = if request.singles.unwrap_or(self.profile.singles_by_default) {
            self.profile.singles
        } else {
            &[]
        };
        if composite.is_none() && singles.is_empty() {
            return Ok(report);
        }

        let cropped = self.crop(cube)?;

        let mut needed: Vec<&'static str> = singles.to_vec();
        if let Some(composite) = composite {
            for spec in &composite.channels {
                match spec {
                    ChannelSpec::Filter(name) => needed.push(*name),
                    ChannelSpec::Ratio(a, b) => needed.extend([*a, *b]),
                    ChannelSpec::Synthetic { terms, .. } => needed.extend(terms.iter().map(|(n, _)| *n)),
                }
            }
        }
        needed.sort_unstable();
        needed.dedup();
        debug!(camera = self.profile.name, filters = ?needed, "Integrating filters");
        let images = self.filter_images(&cropped, &needed)?;

        if let Some(composite) = composite {
            let image = self.render_composite(composite, &images, &cropped)?;
            let path = output_path(base, composite.keyword);
            write_output(&self.writer, &image, &path, &self.config)?;
            report.written.push(path);
        }

        for name in singles {
            let filter = images
                .get(name)
                .ok_or_else(|| PipelineError::DegenerateFilter(format!("{} was not integrated", name)))?;
            let image = self.render_single(filter)?;
            let path = output_path(base, name);
            write_output(&self.writer, &image, &path, &self.config)?;
            report.written.push(path);
        }

        Ok(report)
    }

    #[instrument(skip(self, input_path, base), fields(camera = self.profile.name))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        base: Q,
        request: &CameraRequest,
    ) -> Result<ConversionReport> {
        let input_path = input_path.as_ref();
        info!(input = %input_path.display(), "Simulating {} filters", self.profile.name);
        let cube = prepare_cube(&self.reader, input_path, &self.axis)?;
        self.convert(&cube, request, base.as_ref())
    }

    pub fn config(&self) -> &TiffConfig {
        &self.config
    }
}

fn transmission(filters: &FilterTable, spec: &FilterSpec) -> Result<Vec<f64>> {
    let weights = match spec.source {
        FilterSource::Column(index) => filters.column(index)?.to_owned(),
        FilterSource::Product(a, b) => &filters.column(a)? * &filters.column(b)?,
        FilterSource::ColumnTimesMean(index, columns) => {
            &filters.column(index)? * &filters.mean_of_columns(columns)?
        }
    };
    Ok(weights.to_vec())
}

fn plane_mean(plane: &Array2<f64>) -> f64 {
    plane.mean().unwrap_or(0.0)
}
