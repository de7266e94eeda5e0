use std::io::Write;

use crate::spectral_pipeline::common::error::Result;
use crate::spectral_pipeline::tiff::types::{OutputImage, TiffConfig};

pub trait TiffWriter {
    fn write_tiff(&self, image: &OutputImage, output: &mut dyn Write, config: &TiffConfig) -> Result<()>;
}
