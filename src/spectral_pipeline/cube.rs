//! Reflectance cube module
//!
//! This module holds the (band, row, column) cube type and format-agnostic
//! cube reading, with a PDS3 label/image reader for map-projected MTRDR data.

mod reader;
mod pds3_reader;
pub mod types;

pub use reader::CubeReader;
pub use pds3_reader::Pds3CubeReader;
pub use types::ReflectanceCube;
