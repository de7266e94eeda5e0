use std::path::Path;

use crate::spectral_pipeline::common::error::Result;
use crate::spectral_pipeline::cube::types::ReflectanceCube;

pub trait CubeReader {
    fn read_cube(&self, path: &Path) -> Result<ReflectanceCube>;
}
