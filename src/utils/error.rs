use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

use flate2::DecompressError;

#[derive(Debug)]
pub enum ApngError {
    IoError(io::Error),
    InvalidSignature,
    InvalidDimensions { width: u32, height: u32 },
    MissingImageData,
    FrameOutOfRange { index: u32, frame_count: u32 },
    IncompleteInput { rows_decoded: u32 },
    CorruptData(String),
    BufferTooSmall { required: usize, actual: usize },
    InvalidRowBytes { row_bytes: usize, minimum: usize },
    Custom(String),
}

impl ApngError {
    /// True for errors that still left usable rows in the destination buffer.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ApngError::IncompleteInput { .. })
    }
}

impl Error for ApngError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApngError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for ApngError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ApngError::IoError(err) => write!(f, "I/O error: {}", err),
            ApngError::InvalidSignature => write!(f, "Not a PNG stream: invalid signature"),
            ApngError::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
            ApngError::MissingImageData => write!(f, "Stream contains no image data"),
            ApngError::FrameOutOfRange { index, frame_count } => {
                write!(f, "Frame index {} out of range (frame count {})", index, frame_count)
            }
            ApngError::IncompleteInput { rows_decoded } => {
                write!(f, "Incomplete input: {} rows decoded", rows_decoded)
            }
            ApngError::CorruptData(msg) => write!(f, "Corrupt image data: {}", msg),
            ApngError::BufferTooSmall { required, actual } => {
                write!(f, "Destination buffer too small: need {} bytes, got {}", required, actual)
            }
            ApngError::InvalidRowBytes { row_bytes, minimum } => {
                write!(f, "Row stride {} is below the minimum of {}", row_bytes, minimum)
            }
            ApngError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<io::Error> for ApngError {
    fn from(error: io::Error) -> Self {
        ApngError::IoError(error)
    }
}

impl From<DecompressError> for ApngError {
    fn from(error: DecompressError) -> Self {
        ApngError::CorruptData(format!("inflate failed: {}", error))
    }
}

// Result type alias for apngcodec operations
pub type ApngResult<T> = Result<T, ApngError>;
