use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Failed to read trace: {0}")]
    TraceError(#[from] TraceError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("No accesses reached {0}; rates and averages are undefined")]
    NoAccesses(&'static str),

    #[error("No trace files found in '{0}'")]
    NoTraces(PathBuf),
}

/// Errors related to reading and parsing trace files
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Invalid format at line {line}: expected 3 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("Unknown operation '{code}' at line {line}: expected 0, 1 or 2")]
    UnknownOperation { line: usize, code: String },

    #[error("Invalid hexadecimal {field} '{value}' at line {line}")]
    InvalidHex {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
