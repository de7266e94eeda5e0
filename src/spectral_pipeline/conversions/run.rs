use std::path::{Path, PathBuf};

use tracing::{error, info, info_span};

use crate::spectral_pipeline::bands::{BandAxis, reconstruct_gaps};
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::cube::{CubeReader, ReflectanceCube};
use crate::spectral_pipeline::tiff::{OutputImage, TiffConfig, TiffWriter};

/// Outcome of one invocation: the files written and the requests that were
/// rejected without stopping the run.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub written: Vec<PathBuf>,
    pub rejected: Vec<String>,
}

impl ConversionReport {
    pub fn produced_any(&self) -> bool {
        !self.written.is_empty()
    }

    /// Records a failed request. Request errors are logged and kept, any other
    /// error is handed back to abort the run.
    pub(crate) fn reject(&mut self, label: &str, err: PipelineError) -> Result<()> {
        if !err.is_request_error() {
            return Err(err);
        }
        error!(request = label, "{}", err);
        self.rejected.push(format!("{}: {}", label, err));
        Ok(())
    }
}

/// Reads a measured cube, zeroes its sentinels and fills both band gaps.
pub(crate) fn prepare_cube<R: CubeReader>(
    reader: &R,
    input_path: &Path,
    axis: &BandAxis,
) -> Result<ReflectanceCube> {
    let measured = {
        let _span = info_span!("read_cube").entered();
        reader.read_cube(input_path)?.sanitize()
    };
    let _span = info_span!("reconstruct_gaps", measured = measured.bands()).entered();
    reconstruct_gaps(&measured, axis)
}

/// `<base>_<label>.tiff`
pub(crate) fn output_path(base: &Path, label: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("_{}.tiff", label));
    PathBuf::from(name)
}

pub(crate) fn write_output<W: TiffWriter>(
    writer: &W,
    image: &OutputImage,
    output_path: &Path,
    config: &TiffConfig,
) -> Result<()> {
    let _span = info_span!("encode_tiff", output = %output_path.display()).entered();
    let mut output_file = std::fs::File::create(output_path).map_err(|e| {
        PipelineError::OutputWriteError(format!("{}: {}", output_path.display(), e))
    })?;
    writer.write_tiff(image, &mut output_file, config)?;
    info!(
        output = %output_path.display(),
        width = image.width,
        height = image.height,
        channels = image.channels,
        "Wrote image"
    );
    Ok(())
}
