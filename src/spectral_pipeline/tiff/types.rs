//! TIFF output configuration and image types

use std::fmt;
use std::str::FromStr;

use ndarray::Array3;

use crate::spectral_pipeline::common::error::{PipelineError, Result};

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - best compression (slower)
    DeflateBest,
    /// Deflate compression - balanced
    DeflateBalanced,
}

impl FromStr for TiffCompression {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(TiffCompression::None),
            "lzw" => Ok(TiffCompression::Lzw),
            "deflate-fast" => Ok(TiffCompression::DeflateFast),
            "deflate" | "deflate-balanced" => Ok(TiffCompression::DeflateBalanced),
            "deflate-best" => Ok(TiffCompression::DeflateBest),
            other => Err(format!(
                "unknown compression '{}', use none, lzw, deflate-fast, deflate or deflate-best",
                other
            )),
        }
    }
}

impl fmt::Display for TiffCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TiffCompression::None => "none",
            TiffCompression::Lzw => "lzw",
            TiffCompression::DeflateFast => "deflate-fast",
            TiffCompression::DeflateBest => "deflate-best",
            TiffCompression::DeflateBalanced => "deflate",
        };
        f.write_str(name)
    }
}

/// Encoder settings shared by every image of a run
#[derive(Debug, Clone)]
pub struct TiffConfig {
    pub compression: TiffCompression,
    /// Predictor value for compression (2 for horizontal differencing)
    pub predictor: Option<u16>,
}

impl Default for TiffConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::DeflateBalanced,
            predictor: None,
        }
    }
}

impl TiffConfig {
    pub fn builder() -> TiffConfigBuilder {
        TiffConfigBuilder::default()
    }
}

/// Builder for TiffConfig
#[derive(Default)]
pub struct TiffConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
}

impl TiffConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn build(self) -> TiffConfig {
        let default = TiffConfig::default();
        TiffConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
        }
    }
}

/// A quantised image ready for encoding, samples interleaved row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputImage {
    pub width: usize,
    pub height: usize,
    /// 1 for gray, 3 for RGB
    pub channels: usize,
    pub data: Vec<u16>,
}

impl OutputImage {
    /// Interleaves a `(channel, row, col)` array. Only 1 or 3 channels can
    /// be encoded.
    pub fn from_planar(planes: &Array3<u16>) -> Result<Self> {
        let (channels, height, width) = planes.dim();
        if channels != 1 && channels != 3 {
            return Err(PipelineError::EncodeError(format!(
                "cannot encode {} channels, expected 1 or 3",
                channels
            )));
        }
        let interleaved = planes.view().permuted_axes([1, 2, 0]);
        Ok(Self {
            width,
            height,
            channels,
            data: interleaved.iter().copied().collect(),
        })
    }

    /// Single channel `index` of the image as its own gray image.
    pub fn channel(&self, index: usize) -> Option<Self> {
        if index >= self.channels {
            return None;
        }
        Some(Self {
            width: self.width,
            height: self.height,
            channels: 1,
            data: self.data.iter().skip(index).step_by(self.channels).copied().collect(),
        })
    }
}
