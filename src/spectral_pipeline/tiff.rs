//! TIFF writing module
//!
//! Rendered products are written as 16-bit TIFF, single channel for band
//! images and three channel for colour composites.

mod standard_tiff_writer;
pub mod types;
mod writer;

pub use standard_tiff_writer::StandardTiffWriter;
pub use types::{OutputImage, TiffCompression, TiffConfig, TiffConfigBuilder};
pub use writer::TiffWriter;
