use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::{info, instrument, warn};

use super::delimited::{Delimiter, read_table};
use crate::spectral_pipeline::bands::BandAxis;
use crate::spectral_pipeline::common::error::{PipelineError, Result};
use crate::spectral_pipeline::spectral::{CalibrationSpectrum, MatchingFunction};

pub const DEFAULT_TABLES_DIR: &str = "matching_functions";
pub const BAND_AXIS_FILE: &str = "mtrdr_axis.tab";
pub const MATCHING_FUNCTION_FILE: &str = "cie-cmf.txt";
pub const CALIBRATION_FILE: &str = "mtrdr_whiteflat.csv";

/// Locations of the reference tables a run depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTables {
    pub band_axis: PathBuf,
    pub matching_function: PathBuf,
    pub calibration: PathBuf,
    /// Directory holding `<camera>-response-mtrdr.txt` filter tables.
    pub filter_dir: PathBuf,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self::from_dir(DEFAULT_TABLES_DIR)
    }
}

impl ReferenceTables {
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            band_axis: dir.join(BAND_AXIS_FILE),
            matching_function: dir.join(MATCHING_FUNCTION_FILE),
            calibration: dir.join(CALIBRATION_FILE),
            filter_dir: dir.to_path_buf(),
        }
    }

    pub fn filter_table(&self, file_name: &str) -> PathBuf {
        self.filter_dir.join(file_name)
    }

    #[instrument(skip(self))]
    pub fn load(&self) -> Result<ReferenceData> {
        let axis = BandAxis::from_table(&self.band_axis)?;
        let cmf = if self.matching_function.exists() {
            MatchingFunction::from_table(&self.matching_function)?
        } else {
            warn!(
                path = %self.matching_function.display(),
                "Matching function table not found, using built-in CIE 1931"
            );
            MatchingFunction::cie_1931()
        };
        let calibration = CalibrationSpectrum::from_table(&self.calibration)?;
        info!(
            bands = axis.len(),
            cmf_samples = cmf.wavelengths().len(),
            calibration_samples = calibration.wavelengths().len(),
            "Reference tables loaded"
        );
        Ok(ReferenceData {
            axis,
            cmf,
            calibration,
        })
    }
}

/// Reference tables after loading; shared read-only by every stage.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub axis: BandAxis,
    pub cmf: MatchingFunction,
    pub calibration: CalibrationSpectrum,
}

/// Filter transmissions sampled on a cropped band axis.
///
/// Column 0 of the source table is the wavelength; columns `1..` are one
/// filter each. Column indices used by [`FilterTable::column`] keep that
/// numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTable {
    wavelengths: Vec<f64>,
    /// Rows are bands, columns are filters.
    responses: Array2<f64>,
}

impl FilterTable {
    pub fn new(wavelengths: Vec<f64>, responses: Array2<f64>) -> Result<Self> {
        if responses.len_of(Axis(0)) != wavelengths.len() {
            return Err(PipelineError::BandCountMismatch {
                expected: wavelengths.len(),
                found: responses.len_of(Axis(0)),
            });
        }
        Ok(Self {
            wavelengths,
            responses,
        })
    }

    /// Loads a tab-delimited filter response table.
    pub fn from_table<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let rows = read_table(path, Delimiter::Tab)?;
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width < 2 {
            return Err(PipelineError::TableParseError {
                path: path.display().to_string(),
                row: 0,
                reason: "expected a wavelength column and at least one filter".to_string(),
            });
        }

        let mut wavelengths = Vec::with_capacity(rows.len());
        let mut responses = Array2::zeros((rows.len(), width - 1));
        for (row, values) in rows.iter().enumerate() {
            if values.len() != width {
                return Err(PipelineError::TableParseError {
                    path: path.display().to_string(),
                    row,
                    reason: format!("expected {} columns, found {}", width, values.len()),
                });
            }
            wavelengths.push(values[0]);
            responses
                .row_mut(row)
                .assign(&ArrayView1::from(&values[1..]));
        }
        Self::new(wavelengths, responses)
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn bands(&self) -> usize {
        self.wavelengths.len()
    }

    /// Number of filter columns, not counting the wavelength column.
    pub fn filters(&self) -> usize {
        self.responses.len_of(Axis(1))
    }

    /// Transmission of table column `index` (1 is the first filter).
    pub fn column(&self, index: usize) -> Result<ArrayView1<'_, f64>> {
        if index == 0 || index > self.filters() {
            return Err(PipelineError::DegenerateFilter(format!(
                "column {} is not a filter column (table has {})",
                index,
                self.filters()
            )));
        }
        Ok(self.responses.column(index - 1))
    }

    /// Per-band mean of the given filter columns.
    pub fn mean_of_columns(&self, columns: &[usize]) -> Result<Array1<f64>> {
        let mut sum = Array1::zeros(self.bands());
        for &index in columns {
            sum += &self.column(index)?;
        }
        if !columns.is_empty() {
            sum /= columns.len() as f64;
        }
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    fn write_temp(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_layout() {
        let tables = ReferenceTables::default();
        assert_eq!(tables.band_axis, Path::new("matching_functions/mtrdr_axis.tab"));
        assert_eq!(tables.calibration, Path::new("matching_functions/mtrdr_whiteflat.csv"));
        assert_eq!(
            tables.filter_table("hirise-response-mtrdr.txt"),
            Path::new("matching_functions/hirise-response-mtrdr.txt")
        );
    }

    #[test]
    fn test_filter_table_columns() {
        let file = write_temp("400\t0.1\t0.5\n410\t0.2\t0.7\n420\t0.3\t0.9\n");
        let table = FilterTable::from_table(file.path()).unwrap();
        assert_eq!(table.bands(), 3);
        assert_eq!(table.filters(), 2);
        assert_eq!(table.wavelengths(), &[400.0, 410.0, 420.0]);
        assert_eq!(table.column(2).unwrap().to_vec(), vec![0.5, 0.7, 0.9]);
        let mean = table.mean_of_columns(&[1, 2]).unwrap();
        for (got, want) in mean.iter().zip([0.3, 0.45, 0.6]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_filter_column_zero_is_wavelength() {
        let file = write_temp("400\t0.1\n410\t0.2\n");
        let table = FilterTable::from_table(file.path()).unwrap();
        assert!(matches!(table.column(0), Err(PipelineError::DegenerateFilter(_))));
        assert!(matches!(table.column(2), Err(PipelineError::DegenerateFilter(_))));
    }

    #[test]
    fn test_ragged_filter_table_is_rejected() {
        let file = write_temp("400\t0.1\t0.5\n410\t0.2\n");
        assert!(matches!(
            FilterTable::from_table(file.path()),
            Err(PipelineError::TableParseError { row: 1, .. })
        ));
    }

    #[test]
    fn test_load_reference_directory() {
        let dir = tempdir().unwrap();
        let axis: String = (0..40)
            .map(|i| {
                let w = 436.13 + 6.55 * i as f64 + if i >= 31 { 76.0 } else { 0.0 };
                format!("{},0,{:.2}\n", i, w)
            })
            .collect();
        std::fs::write(dir.path().join(BAND_AXIS_FILE), axis).unwrap();
        std::fs::write(
            dir.path().join(MATCHING_FUNCTION_FILE),
            "380 0.001 0.0 0.006\n385 0.002 0.0001 0.01\n",
        )
        .unwrap();
        std::fs::write(dir.path().join(CALIBRATION_FILE), "0,436.13,0.5\n1,442.68,0.6\n").unwrap();

        let data = ReferenceTables::from_dir(dir.path()).load().unwrap();
        assert_eq!(data.axis.len(), 40 + 19);
        assert_eq!(data.cmf.wavelengths(), &[380.0, 385.0]);
        assert_eq!(data.calibration.reflectance(), &[0.5, 0.6]);
    }

    #[test]
    fn test_missing_matching_function_falls_back_to_cie_1931() {
        let dir = tempdir().unwrap();
        let axis: String = (0..40).map(|i| format!("{},0,{:.2}\n", i, 436.13 + 6.55 * i as f64)).collect();
        std::fs::write(dir.path().join(BAND_AXIS_FILE), axis).unwrap();
        std::fs::write(dir.path().join(CALIBRATION_FILE), "0,436.13,0.5\n").unwrap();

        let data = ReferenceTables::from_dir(dir.path()).load().unwrap();
        assert_eq!(data.cmf.wavelengths(), MatchingFunction::cie_1931().wavelengths());
    }

    #[test]
    fn test_missing_table_is_reported() {
        let dir = tempdir().unwrap();
        let result = ReferenceTables::from_dir(dir.path()).load();
        assert!(matches!(result, Err(PipelineError::TableReadError(_, _))));
    }
}
