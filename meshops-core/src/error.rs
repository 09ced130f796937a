//! Error types for meshops

use thiserror::Error;

/// Main error type for meshops operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("mesh has no faces")]
    EmptyMesh,

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("reference mesh is not closed ({0} unpaired edges)")]
    NonClosedMesh(usize),

    #[error("numerically degenerate query after {0} perturbation retries")]
    DegenerateQuery(usize),

    #[error("invalid simplification rate {0}, expected a value in (0, 1]")]
    InvalidRate(f32),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for meshops operations
pub type Result<T> = std::result::Result<T, Error>;
