//! Structured lattice metadata.
//!
//! A [`GridDescriptor`] fully describes a rectangular 2D lattice of bin centres.
//! Records whose data no longer forms such a lattice carry
//! [`GridState::Unstructured`] instead, which keeps only the bin spacing.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::field::FieldLabel;

/// Inclusive lower and upper bound. `None` leaves that side unbounded.
pub type Limits = (Option<f64>, Option<f64>);

/// Lattice with bin `(0, 0)` centred at `origin`.
///
/// `shape` is `[nx, ny]`. Flattened data is ordered y-major, x-minor: the
/// value of column `i` in row `j` lives at `j * nx + i`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDescriptor {
    pub origin: [f64; 2],
    pub spacing: [f64; 2],
    pub shape: [usize; 2],
}

impl GridDescriptor {
    pub fn new(origin: [f64; 2], spacing: [f64; 2], shape: [usize; 2]) -> Self {
        debug_assert!(spacing[0] > 0.0 && spacing[1] > 0.0);
        Self {
            origin,
            spacing,
            shape,
        }
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.shape[0] * self.shape[1]
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.shape[0]
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.shape[1]
    }

    /// Bin centres along one axis (0 for x, 1 for y).
    pub fn axis(&self, axis: usize) -> Vec<f64> {
        (0..self.shape[axis])
            .map(|i| self.origin[axis] + self.spacing[axis] * i as f64)
            .collect()
    }

    /// Meshed x and y centre coordinates of every bin in raster order.
    pub fn coordinates(&self) -> (Vec<f64>, Vec<f64>) {
        mesh(&self.axis(0), &self.axis(1))
    }

    pub fn size(&self) -> [f64; 2] {
        [
            self.shape[0] as f64 * self.spacing[0],
            self.shape[1] as f64 * self.spacing[1],
        ]
    }

    /// Row and column of the bin centred at `(x, y)`, rounded to the nearest bin.
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x - self.origin[0]) / self.spacing[0]).round();
        let row = ((y - self.origin[1]) / self.spacing[1]).round();
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }
}

/// Whether a record's data is known to fill a structured lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridState {
    Structured(GridDescriptor),
    Unstructured { spacing: Option<[f64; 2]> },
}

impl Default for GridState {
    fn default() -> Self {
        GridState::Unstructured { spacing: None }
    }
}

impl GridState {
    /// The descriptor, or [`GridError::ShapeUndefined`] naming `operation`.
    pub fn descriptor(&self, operation: &'static str) -> GridResult<&GridDescriptor> {
        match self {
            GridState::Structured(descriptor) => Ok(descriptor),
            GridState::Unstructured { .. } => Err(GridError::ShapeUndefined(operation)),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, GridState::Structured(_))
    }

    pub fn spacing(&self) -> Option<[f64; 2]> {
        match self {
            GridState::Structured(descriptor) => Some(descriptor.spacing),
            GridState::Unstructured { spacing } => *spacing,
        }
    }

    pub fn shape(&self) -> Option<[usize; 2]> {
        match self {
            GridState::Structured(descriptor) => Some(descriptor.shape),
            GridState::Unstructured { .. } => None,
        }
    }

    pub fn origin(&self) -> Option<[f64; 2]> {
        match self {
            GridState::Structured(descriptor) => Some(descriptor.origin),
            GridState::Unstructured { .. } => None,
        }
    }

    pub fn coordinates(&self) -> GridResult<(Vec<f64>, Vec<f64>)> {
        Ok(self.descriptor("coordinates")?.coordinates())
    }

    /// Physical extent of the lattice. `None` when the shape is unknown.
    pub fn size(&self) -> Option<[f64; 2]> {
        match self {
            GridState::Structured(descriptor) => Some(descriptor.size()),
            GridState::Unstructured { .. } => None,
        }
    }

    /// State after an arbitrary subset of bins was selected.
    pub fn restricted(&self) -> GridState {
        GridState::Unstructured {
            spacing: self.spacing(),
        }
    }
}

/// Loose grid metadata as supplied next to raw data by readers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridInfo {
    pub origin: Option<[f64; 2]>,
    pub spacing: Option<[f64; 2]>,
    pub shape: Option<[usize; 2]>,
    pub num_bins: Option<usize>,
}

impl GridInfo {
    pub fn structured(descriptor: &GridDescriptor) -> Self {
        Self {
            origin: Some(descriptor.origin),
            spacing: Some(descriptor.spacing),
            shape: Some(descriptor.shape),
            num_bins: Some(descriptor.num_bins()),
        }
    }
}

impl From<&GridState> for GridInfo {
    fn from(state: &GridState) -> Self {
        match state {
            GridState::Structured(descriptor) => GridInfo::structured(descriptor),
            GridState::Unstructured { spacing } => GridInfo {
                spacing: *spacing,
                ..GridInfo::default()
            },
        }
    }
}

/// Selection mask of `values` lying inside `limits`, bounds inclusive.
pub fn axis_mask(label: &FieldLabel, values: &[f64], limits: Limits) -> GridResult<Vec<bool>> {
    let (lo, hi) = limits;
    for bound in [lo, hi].into_iter().flatten() {
        if bound.is_nan() {
            return Err(GridError::LimitType {
                label: label.clone(),
                reason: "limit is not a number".to_string(),
            });
        }
    }
    let lo = lo.unwrap_or(f64::NEG_INFINITY);
    let hi = hi.unwrap_or(f64::INFINITY);
    Ok(values.iter().map(|&v| v >= lo && v <= hi).collect())
}

/// `start, start + step, ...` up to but excluding `stop`.
pub(crate) fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let count = ((stop - start) / step).ceil();
    let count = if count.is_finite() && count > 0.0 {
        count as usize
    } else {
        0
    };
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Mesh two axes into flattened coordinate arrays, y-major and x-minor.
pub(crate) fn mesh(xs: &[f64], ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let total = xs.len() * ys.len();
    let mut mesh_x = Vec::with_capacity(total);
    let mut mesh_y = Vec::with_capacity(total);
    for &y in ys {
        for &x in xs {
            mesh_x.push(x);
            mesh_y.push(y);
        }
    }
    (mesh_x, mesh_y)
}
