use thiserror::Error;

use crate::field::FieldLabel;

pub type GridResult<T> = Result<T, GridError>;

/// Failures raised by the grid algebra operations.
///
/// A zero weight sum inside an averaging window is not an error; those cells
/// are written as zero.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("failed to construct field record: {0}")]
    Construction(String),
    #[error("record has no field with label '{0}'")]
    LabelNotFound(FieldLabel),
    #[error("bad input limits for '{label}': {reason}")]
    LimitType { label: FieldLabel, reason: String },
    #[error("coordinates of records to average do not match (record {index}, field '{label}')")]
    CoordinateMismatch { index: usize, label: FieldLabel },
    #[error("no input records given")]
    EmptyInput,
    #[error("grid shape is undefined for {0}")]
    ShapeUndefined(&'static str),
    #[error("window at (row {row}, col {col}) of size {rows}x{cols} does not fit a {grid_rows}x{grid_cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
        grid_rows: usize,
        grid_cols: usize,
    },
    #[error("point ({x}, {y}) lies outside the grid")]
    OutsideGrid { x: f64, y: f64 },
    #[error("resampling factor must be at least 1, got {0}")]
    InvalidFactor(usize),
}
