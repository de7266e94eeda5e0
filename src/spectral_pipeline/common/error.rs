use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read reference table {0}: {1}")]
    TableReadError(String, String),

    #[error("Malformed reference table {path}, row {row}: {reason}")]
    TableParseError {
        path: String,
        row: usize,
        reason: String,
    },

    #[error("Failed to read input cube: {0}")]
    InputReadError(String),

    #[error("Failed to decode cube: {0}")]
    DecodeError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Band count mismatch: expected {expected}, found {found}")]
    BandCountMismatch { expected: usize, found: usize },

    #[error("Colour system primaries are degenerate")]
    SingularPrimaries,

    #[error("Filter has no significant passband: {0}")]
    DegenerateFilter(String),

    #[error("Calibration spectrum is unusable: {0}")]
    DegenerateCalibration(String),

    #[error("Invalid wavelength window: {0}")]
    InvalidWindow(String),

    #[error("Unknown wavelength window name: {0}")]
    UnknownWindow(String),

    #[error("Invalid color keyword '{keyword}', use {expected}")]
    InvalidColorKeyword { keyword: String, expected: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PipelineError {
    /// Errors caused by a single malformed request. These abort only the
    /// output they belong to; everything else is fatal for the run.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidWindow(_)
                | PipelineError::UnknownWindow(_)
                | PipelineError::InvalidColorKeyword { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_are_classified() {
        assert!(PipelineError::InvalidWindow("[380]".into()).is_request_error());
        assert!(PipelineError::UnknownWindow("XYZ".into()).is_request_error());
        assert!(
            PipelineError::InvalidColorKeyword {
                keyword: "FOO".into(),
                expected: "'RGB'".into(),
            }
            .is_request_error()
        );
        assert!(!PipelineError::SingularPrimaries.is_request_error());
        assert!(
            !PipelineError::BandCountMismatch {
                expected: 3,
                found: 2
            }
            .is_request_error()
        );
    }
}
