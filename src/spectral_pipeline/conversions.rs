//! Pipeline conversions module
//!
//! Orchestration from a reflectance cube to written images: colour
//! reconstruction per wavelength window, and filter-set simulation of other
//! cameras.

mod camera;
pub mod camera_profiles;
mod run;
mod window_to_color;


pub use camera::{CameraPipeline, CameraRequest};
pub use camera_profiles::{Camera, CameraProfile};
pub use run::ConversionReport;
pub use window_to_color::{
    ColorConfig, ColorConfigBuilder, ColorPipeline, LuminanceWeighting, NamedWindow, WavelengthWindow,
    WindowRequest,
};
