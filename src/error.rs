use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the navigator, the authoring helpers and the session.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no group named \"{segment}\" while resolving \"{path}\"")]
    NotFound { path: String, segment: String },

    #[error("\"{0}\" already exists")]
    AlreadyExists(String),

    #[error("{labels} column labels given for data with {columns} columns")]
    ShapeMismatch { labels: usize, columns: usize },

    #[error("\"{path}\" has {ndim} dimensions, expected 1 or 2")]
    Dimensions { path: String, ndim: usize },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error("\"{0}\" holds no data")]
    NoData(String),

    #[error("invalid column selection {0:?}")]
    InvalidColumns(String),

    #[error("column {index} out of range ({columns} columns)")]
    ColumnOutOfRange { index: usize, columns: usize },

    #[error("unsupported file extension: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid attribute text: {0}")]
    InvalidText(String),

    #[error(transparent)]
    Hdf5(#[from] hdf5::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
