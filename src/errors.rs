use ndarray_linalg::error::LinalgError;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Every failure the analyses can produce.
///
/// None of these are recovered from: the analyses are single-shot, so an error
/// aborts the run and is reported by the binary.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: cannot parse {token:?} as a number")]
    Parse { path: PathBuf, line: usize, token: String },

    #[error("{path}:{line}: expected {expected} columns, found {found}")]
    RaggedTable { path: PathBuf, line: usize, expected: usize, found: usize },

    #[error("cannot reshape {n_elements} elements into records of {record_size}")]
    Reshape { n_elements: usize, record_size: usize },

    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    #[error("dimension mismatch: vector has {vector_len} entries, matrix is {n_rows}x{n_cols}")]
    DimensionMismatch { vector_len: usize, n_rows: usize, n_cols: usize },

    #[error("linear algebra failure: {0}")]
    Linalg(#[from] LinalgError),

    #[error("invalid bin range: min={min} max={max} width={width}")]
    InvalidBinRange { min: f64, max: f64, width: f64 },

    #[error("empty input: {what}")]
    EmptyInput { what: String },

    #[error("failed to draw {path}: {message}")]
    Plot { path: PathBuf, message: String },

    #[error("invalid configuration {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("fatal: input {what} does not exist: {path}")]
    MissingInput { what: String, path: PathBuf },

    #[error("no true tracks known for vertex {vertex_index}; set correct_track_indices")]
    UnknownTrueTracks { vertex_index: usize },

    #[error("vertex finder {0} is not provided by this backend")]
    UnsupportedVertexFinder(String),

    #[error("failed to start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        return Error::Io { path: path.into(), source };
    }
}
