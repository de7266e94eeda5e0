use std::io::Write;

use tiff::encoder::colortype::{Gray16, RGB16};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder};
use tiff::tags::Predictor;
use tracing::debug;

use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::tiff::types::{OutputImage, TiffCompression, TiffConfig};
use crate::spectral_pipeline::tiff::writer::TiffWriter;

pub struct StandardTiffWriter;

impl TiffWriter for StandardTiffWriter {
    fn write_tiff(&self, image: &OutputImage, output: &mut dyn Write, config: &TiffConfig) -> Result<()> {
        debug!(
            width = image.width,
            height = image.height,
            channels = image.channels,
            "Encoding TIFF image"
        );

        let expected = image.width * image.height * image.channels;
        if image.data.len() != expected {
            return Err(PipelineError::EncodeError(format!(
                "buffer holds {} samples, {}x{}x{} needs {}",
                image.data.len(),
                image.width,
                image.height,
                image.channels,
                expected
            )));
        }

        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| PipelineError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        let width = image.width as u32;
        let height = image.height as u32;
        let written = match image.channels {
            1 => encoder.write_image::<Gray16>(width, height, &image.data),
            3 => encoder.write_image::<RGB16>(width, height, &image.data),
            other => {
                return Err(PipelineError::EncodeError(format!(
                    "cannot encode {} channels",
                    other
                )));
            }
        };
        written.map_err(|e| PipelineError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!(bytes = buffer.len(), "TIFF encoding complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::decoder::{Decoder, DecodingResult};

    fn decode(bytes: Vec<u8>) -> (u32, u32, tiff::ColorType, Vec<u16>) {
        let mut decoder = Decoder::new(std::io::Cursor::new(bytes)).unwrap();
        let (w, h) = decoder.dimensions().unwrap();
        let colortype = decoder.colortype().unwrap();
        match decoder.read_image().unwrap() {
            DecodingResult::U16(data) => (w, h, colortype, data),
            _ => panic!("expected 16-bit samples"),
        }
    }

    #[test]
    fn test_gray_round_trip() {
        let image = OutputImage {
            width: 3,
            height: 2,
            channels: 1,
            data: vec![0, 1, 2, 65535, 4, 5],
        };
        let mut out = Vec::new();
        StandardTiffWriter
            .write_tiff(&image, &mut out, &TiffConfig::default())
            .unwrap();

        let (w, h, colortype, data) = decode(out);
        assert_eq!((w, h), (3, 2));
        assert_eq!(colortype, tiff::ColorType::Gray(16));
        assert_eq!(data, image.data);
    }

    #[test]
    fn test_rgb_with_predictor() {
        let image = OutputImage {
            width: 2,
            height: 1,
            channels: 3,
            data: vec![1, 2, 3, 400, 500, 600],
        };
        let config = TiffConfig::builder()
            .compression(TiffCompression::Lzw)
            .predictor(Some(2))
            .build();
        let mut out = Vec::new();
        StandardTiffWriter.write_tiff(&image, &mut out, &config).unwrap();

        let (_, _, colortype, data) = decode(out);
        assert_eq!(colortype, tiff::ColorType::RGB(16));
        assert_eq!(data, image.data);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let image = OutputImage {
            width: 4,
            height: 4,
            channels: 1,
            data: vec![0; 3],
        };
        let mut out = Vec::new();
        let result = StandardTiffWriter.write_tiff(&image, &mut out, &TiffConfig::default());
        assert!(matches!(result, Err(PipelineError::EncodeError(_))));
        assert!(out.is_empty());
    }
}
