//! Error types for submissions and dataset storage.

use std::path::PathBuf;
use thiserror::Error;

/// A submission was rejected before anything was written.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("you must agree to the consent terms before proceeding")]
    ConsentNotGiven,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("age must be between {min} and {max}, got {value}")]
    AgeOutOfRange { value: u32, min: u32, max: u32 },

    #[error("{field} must be a rating between 1 and 5, got {value}")]
    RatingOutOfRange { field: &'static str, value: u8 },

    #[error("unknown {field} '{value}' (expected one of: {expected})")]
    UnknownOption {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("unknown task '{0}'; run `usarec tasks` to list the catalog")]
    UnknownTask(String),
}

/// Failure reading or writing a dataset file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create data directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open dataset {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write dataset {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode record for {}: {source}", path.display())]
    Encode { path: PathBuf, source: csv::Error },

    #[error("failed to decode {} at line {line}: {source}", path.display())]
    Decode {
        path: PathBuf,
        line: u64,
        source: csv::Error,
    },

    #[error(
        "header of {} does not match the record columns (expected [{}], found [{}])",
        path.display(),
        expected.join(", "),
        found.join(", ")
    )]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Either half of a failed form submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl SubmitError {
    /// Process exit code for this failure: 2 for rejected input, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            SubmitError::Validation(_) => 2,
            SubmitError::Storage(_) => 1,
        }
    }
}
