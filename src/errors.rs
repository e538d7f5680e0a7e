//! Centralized error handling for RuSweepVis
//!
//! This module provides structured error types covering the registry,
//! assembly, subsetting and auto-layout contracts, enabling better error
//! context and type safety than a generic `Box<dyn Error>`.

use std::fmt;

/// Main error type for RuSweepVis operations
#[derive(Debug)]
pub enum SweepVisError {
    /// A parameter with this name is already registered
    DuplicateParameter { name: String },

    /// Parameter not found in the registry
    ParameterNotFound { name: String },

    /// Data variable not found in any dataset
    VariableNotFound { var: String },

    /// Coordinate not found in a dataset
    CoordinateNotFound { coord: String },

    /// Run identifier did not resolve to a stored run file
    RunNotFound { run: i64 },

    /// Variable filter shape does not match the number of inputs
    ShapeMismatch { message: String },

    /// Subset index shape not handled by the indexing protocol
    UnsupportedIndex { message: String },

    /// Integer subset index out of bounds
    OutOfRange { index: usize, len: usize },

    /// Auto-layout cannot handle the requested coordinate-dimension count
    Dimensionality { message: String },

    /// Parameter update with an unrecognized attribute name
    UnknownField { field: String },

    /// Per-dataset load or selection failure, annotated with its origin
    SelectionFailed {
        dataset: String,
        source: Box<SweepVisError>,
    },

    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// JSON store or snapshot parsing errors
    JsonError(serde_json::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Generic error for anything without a dedicated variant
    Generic(String),
}

impl fmt::Display for SweepVisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepVisError::DuplicateParameter { name } => {
                write!(f, "A parameter with name '{}' already exists", name)
            }
            SweepVisError::ParameterNotFound { name } => {
                write!(f, "Parameter '{}' not found in the registry", name)
            }
            SweepVisError::VariableNotFound { var } => {
                write!(f, "Data variable '{}' not found", var)
            }
            SweepVisError::CoordinateNotFound { coord } => {
                write!(f, "Coordinate '{}' not found", coord)
            }
            SweepVisError::RunNotFound { run } => {
                write!(f, "Run {} not found in the data directory", run)
            }
            SweepVisError::ShapeMismatch { message } => {
                write!(f, "Filter shape mismatch: {}", message)
            }
            SweepVisError::UnsupportedIndex { message } => {
                write!(f, "Unsupported subset index: {}", message)
            }
            SweepVisError::OutOfRange { index, len } => write!(
                f,
                "Requested index ({}) out of range for a collection of {} dataset(s)",
                index, len
            ),
            SweepVisError::Dimensionality { message } => {
                write!(f, "Auto-plotting is not supported: {}", message)
            }
            SweepVisError::UnknownField { field } => {
                write!(f, "Parameter has no attribute '{}'", field)
            }
            SweepVisError::SelectionFailed { dataset, source } => {
                write!(f, "Could not select data in {}: {}", dataset, source)
            }
            SweepVisError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            SweepVisError::IoError(e) => write!(f, "I/O error: {}", e),
            SweepVisError::JsonError(e) => write!(f, "JSON error: {}", e),
            SweepVisError::ArrayError(e) => write!(f, "Array error: {}", e),
            SweepVisError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            SweepVisError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SweepVisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweepVisError::SelectionFailed { source, .. } => Some(source.as_ref()),
            SweepVisError::NetCDFError(e) => Some(e),
            SweepVisError::IoError(e) => Some(e),
            SweepVisError::JsonError(e) => Some(e),
            SweepVisError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for SweepVisError {
    fn from(error: netcdf::Error) -> Self {
        SweepVisError::NetCDFError(error)
    }
}

impl From<std::io::Error> for SweepVisError {
    fn from(error: std::io::Error) -> Self {
        SweepVisError::IoError(error)
    }
}

impl From<serde_json::Error> for SweepVisError {
    fn from(error: serde_json::Error) -> Self {
        SweepVisError::JsonError(error)
    }
}

impl From<ndarray::ShapeError> for SweepVisError {
    fn from(error: ndarray::ShapeError) -> Self {
        SweepVisError::ArrayError(error)
    }
}

impl From<String> for SweepVisError {
    fn from(error: String) -> Self {
        SweepVisError::Generic(error)
    }
}

impl From<&str> for SweepVisError {
    fn from(error: &str) -> Self {
        SweepVisError::Generic(error.to_string())
    }
}

/// Result type alias for RuSweepVis operations
pub type Result<T> = std::result::Result<T, SweepVisError>;
