//! Cube reader for PDS3 detached-label images.
//!
//! Map-projected CRISM MTRDR products ship as a `.lbl` text label next to a
//! raw `.img` file. Only the keywords needed to lay out the sample array are
//! interpreted; everything else in the label is ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use tracing::{debug, info};

use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::cube::reader::CubeReader;
use crate::spectral_pipeline::cube::types::ReflectanceCube;

/// Reads a cube from a PDS3 label, following its `^IMAGE` pointer.
pub struct Pds3CubeReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interleave {
    BandSequential,
    LineInterleaved,
    SampleInterleaved,
}

#[derive(Debug, Clone, PartialEq)]
struct ImageLayout {
    file: PathBuf,
    offset: usize,
    lines: usize,
    samples: usize,
    bands: usize,
    sample_bytes: usize,
    byte_order: ByteOrder,
    interleave: Interleave,
}

impl CubeReader for Pds3CubeReader {
    fn read_cube(&self, path: &Path) -> Result<ReflectanceCube> {
        let label = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::InputReadError(format!("{}: {}", path.display(), e)))?;
        let layout = parse_label(&label, path)?;
        debug!(?layout, "Parsed PDS3 label");

        let bytes = std::fs::read(&layout.file).map_err(|e| {
            PipelineError::InputReadError(format!("{}: {}", layout.file.display(), e))
        })?;
        let cube = decode_image(&bytes, &layout)?;

        info!(
            bands = cube.bands(),
            rows = cube.rows(),
            cols = cube.cols(),
            "Read PDS3 cube"
        );
        Ok(cube)
    }
}

/// Splits the label into `KEY = VALUE` statements, keeping top-level keys and
/// the keys of the first `IMAGE` object separately.
fn label_statements(label: &str) -> (HashMap<String, String>, HashMap<String, String>) {
    let mut top = HashMap::new();
    let mut image = HashMap::new();
    let mut depth = 0usize;
    let mut in_image = false;
    let mut image_seen = false;

    for line in label.lines() {
        let line = line.split("/*").next().unwrap_or("").trim();
        if line == "END" {
            break;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim().to_string();

        match key.as_str() {
            "OBJECT" => {
                depth += 1;
                if depth == 1 && value.eq_ignore_ascii_case("IMAGE") && !image_seen {
                    in_image = true;
                    image_seen = true;
                }
            }
            "END_OBJECT" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    in_image = false;
                }
            }
            _ if in_image && depth == 1 => {
                image.entry(key).or_insert(value);
            }
            _ if depth == 0 => {
                top.entry(key).or_insert(value);
            }
            _ => {}
        }
    }
    (top, image)
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim()
}

fn integer(map: &HashMap<String, String>, key: &str) -> Result<usize> {
    let raw = map
        .get(key)
        .ok_or_else(|| PipelineError::DecodeError(format!("label is missing {}", key)))?;
    let number = raw.split_whitespace().next().unwrap_or("");
    number
        .parse::<usize>()
        .map_err(|_| PipelineError::DecodeError(format!("{} = {} is not an integer", key, raw)))
}

fn parse_label(label: &str, label_path: &Path) -> Result<ImageLayout> {
    let (top, image) = label_statements(label);
    let dir = label_path.parent().unwrap_or_else(|| Path::new("."));

    let pointer = top
        .get("^IMAGE")
        .ok_or_else(|| PipelineError::DecodeError("label has no ^IMAGE pointer".to_string()))?;
    let record_bytes = integer(&top, "RECORD_BYTES").ok();
    let (file, offset) = resolve_pointer(pointer, label_path, dir, record_bytes)?;

    let sample_bits = integer(&image, "SAMPLE_BITS")?;
    let sample_bytes = match sample_bits {
        32 => 4,
        64 => 8,
        other => {
            return Err(PipelineError::DecodeError(format!(
                "unsupported SAMPLE_BITS {}",
                other
            )));
        }
    };

    let sample_type = image
        .get("SAMPLE_TYPE")
        .map(|v| unquote(v).to_ascii_uppercase())
        .unwrap_or_default();
    let byte_order = match sample_type.as_str() {
        "PC_REAL" => ByteOrder::Little,
        "IEEE_REAL" | "REAL" | "MAC_REAL" | "SUN_REAL" => ByteOrder::Big,
        other => {
            return Err(PipelineError::DecodeError(format!(
                "unsupported SAMPLE_TYPE {}",
                other
            )));
        }
    };

    let storage = image
        .get("BAND_STORAGE_TYPE")
        .map(|v| unquote(v).to_ascii_uppercase())
        .unwrap_or_else(|| "BAND_SEQUENTIAL".to_string());
    let interleave = match storage.as_str() {
        "BAND_SEQUENTIAL" => Interleave::BandSequential,
        "LINE_INTERLEAVED" => Interleave::LineInterleaved,
        "SAMPLE_INTERLEAVED" => Interleave::SampleInterleaved,
        other => {
            return Err(PipelineError::DecodeError(format!(
                "unsupported BAND_STORAGE_TYPE {}",
                other
            )));
        }
    };

    Ok(ImageLayout {
        file,
        offset,
        lines: integer(&image, "LINES")?,
        samples: integer(&image, "LINE_SAMPLES")?,
        bands: integer(&image, "BANDS").unwrap_or(1),
        sample_bytes,
        byte_order,
        interleave,
    })
}

/// Handles `"FILE.IMG"`, `("FILE.IMG", n)`, `n` and `n <BYTES>` pointer forms.
/// Record offsets are 1-based.
fn resolve_pointer(
    pointer: &str,
    label_path: &Path,
    dir: &Path,
    record_bytes: Option<usize>,
) -> Result<(PathBuf, usize)> {
    let inner = pointer.trim().trim_start_matches('(').trim_end_matches(')');
    let mut parts = inner.splitn(2, ',').map(str::trim);
    let first = parts.next().unwrap_or("");
    let second = parts.next();

    let record_offset = |field: &str| -> Result<usize> {
        let mut tokens = field.split_whitespace();
        let n: usize = tokens.next().unwrap_or("").parse().map_err(|_| {
            PipelineError::DecodeError(format!("bad ^IMAGE offset '{}'", field))
        })?;
        let in_bytes = tokens
            .next()
            .is_some_and(|unit| unit.eq_ignore_ascii_case("<BYTES>"));
        if in_bytes {
            return Ok(n.saturating_sub(1));
        }
        let record = record_bytes.ok_or_else(|| {
            PipelineError::DecodeError("record offset without RECORD_BYTES".to_string())
        })?;
        n.saturating_sub(1).checked_mul(record).ok_or_else(|| {
            PipelineError::DecodeError(format!("^IMAGE offset '{}' overflows", field))
        })
    };

    if first.starts_with('"') {
        let file = locate_data_file(dir, unquote(first));
        let offset = match second {
            Some(field) => record_offset(field)?,
            None => 0,
        };
        Ok((file, offset))
    } else {
        Ok((label_path.to_path_buf(), record_offset(first)?))
    }
}

/// Archive labels name files in upper case while mirrors often store them in
/// lower case.
fn locate_data_file(dir: &Path, name: &str) -> PathBuf {
    [
        name.to_string(),
        name.to_ascii_lowercase(),
        name.to_ascii_uppercase(),
    ]
    .into_iter()
    .map(|candidate| dir.join(candidate))
    .find(|candidate| candidate.exists())
    .unwrap_or_else(|| dir.join(name))
}

fn decode_image(bytes: &[u8], layout: &ImageLayout) -> Result<ReflectanceCube> {
    let overflow = || PipelineError::DecodeError("image dimensions overflow the address space".to_string());
    let count = layout
        .lines
        .checked_mul(layout.samples)
        .and_then(|n| n.checked_mul(layout.bands))
        .ok_or_else(overflow)?;
    let needed = count.checked_mul(layout.sample_bytes).ok_or_else(overflow)?;
    let end = layout.offset.checked_add(needed).ok_or_else(overflow)?;
    let payload = bytes
        .get(layout.offset..end)
        .ok_or_else(|| {
            PipelineError::DecodeError(format!(
                "image needs {} bytes at offset {}, file has {}",
                needed,
                layout.offset,
                bytes.len()
            ))
        })?;

    let values: Vec<f64> = match (layout.sample_bytes, layout.byte_order) {
        (4, ByteOrder::Little) => payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        (4, ByteOrder::Big) => payload
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        (_, ByteOrder::Little) => payload
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
        (_, ByteOrder::Big) => payload
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
    };

    let (lines, samples, bands) = (layout.lines, layout.samples, layout.bands);
    let shape_error = |e: ndarray::ShapeError| PipelineError::DecodeError(e.to_string());
    let data = match layout.interleave {
        Interleave::BandSequential => {
            Array3::from_shape_vec((bands, lines, samples), values).map_err(shape_error)?
        }
        Interleave::LineInterleaved => Array3::from_shape_vec((lines, bands, samples), values)
            .map_err(shape_error)?
            .permuted_axes([1, 0, 2])
            .as_standard_layout()
            .into_owned(),
        Interleave::SampleInterleaved => Array3::from_shape_vec((lines, samples, bands), values)
            .map_err(shape_error)?
            .permuted_axes([2, 0, 1])
            .as_standard_layout()
            .into_owned(),
    };
    Ok(ReflectanceCube::new(data))
}
