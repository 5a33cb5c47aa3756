//! Common lattices for records sampled on misaligned grids.

use crate::error::{GridError, GridResult};
use crate::field::{Dtype, FieldLabel};
use crate::grid::{arange, mesh, GridDescriptor, GridState};
use crate::record::FieldRecord;

/// Smallest lattice at `spacing` covering the coordinates of every record.
///
/// The result carries every label found in any input. Coordinate columns hold
/// the bin centres and all other columns are zero. The upper end of each axis
/// is included even when the extent is not a whole multiple of the spacing.
pub fn combined_grid(
    records: &[FieldRecord],
    coord_labels: &[FieldLabel; 2],
    spacing: [f64; 2],
) -> GridResult<FieldRecord> {
    if records.is_empty() {
        return Err(GridError::EmptyInput);
    }
    if spacing.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        return Err(GridError::Construction(format!(
            "bin spacing must be positive, got {spacing:?}"
        )));
    }

    let mut bounds = [[f64::INFINITY, f64::NEG_INFINITY]; 2];
    for record in records {
        let (xs, ys) = record.coords(coord_labels)?;
        for (axis, values) in [xs, ys].into_iter().enumerate() {
            for &v in values {
                bounds[axis][0] = bounds[axis][0].min(v);
                bounds[axis][1] = bounds[axis][1].max(v);
            }
        }
    }
    if bounds.iter().any(|[lo, hi]| lo > hi) {
        return Err(GridError::EmptyInput);
    }

    let axes: Vec<Vec<f64>> = bounds
        .iter()
        .zip(spacing)
        .map(|([lo, hi], d)| arange(*lo, hi + d, d))
        .collect();
    let descriptor = GridDescriptor::new(
        [bounds[0][0], bounds[1][0]],
        spacing,
        [axes[0].len(), axes[1].len()],
    );
    let (mesh_x, mesh_y) = mesh(&axes[0], &axes[1]);

    let mut labels: Vec<FieldLabel> = Vec::new();
    let mut dtypes: Vec<Dtype> = Vec::new();
    for record in records {
        for (label, dtype) in record.labels().iter().zip(record.dtypes()) {
            if !labels.contains(label) {
                labels.push(label.clone());
                dtypes.push(*dtype);
            }
        }
    }
    let columns = labels
        .iter()
        .map(|label| {
            if *label == coord_labels[0] {
                mesh_x.clone()
            } else if *label == coord_labels[1] {
                mesh_y.clone()
            } else {
                vec![0.0; descriptor.num_bins()]
            }
        })
        .collect();

    tracing::debug!(
        target: "flow_core::unify",
        inputs = records.len(),
        nx = descriptor.cols(),
        ny = descriptor.rows(),
        "combined_grid.built"
    );

    Ok(FieldRecord::from_parts(
        labels,
        dtypes,
        columns,
        GridState::Structured(descriptor),
    ))
}

/// Row and column of `block`'s first bin inside `grid`.
pub fn block_offset(grid: &FieldRecord, block: &FieldRecord) -> GridResult<(usize, usize)> {
    let target = grid.grid().descriptor("data transfer")?;
    let [x, y] = block.grid().descriptor("data transfer")?.origin;
    target.locate(x, y).ok_or(GridError::OutsideGrid { x, y })
}

/// Copy the data fields of `block` into `grid` starting at `(row, col)`.
///
/// Returns a new flattened record; the coordinate columns of `grid` and every
/// bin outside the block window keep their values.
pub fn transfer_data(
    grid: &FieldRecord,
    block: &FieldRecord,
    offset: (usize, usize),
    coord_labels: &[FieldLabel; 2],
) -> GridResult<FieldRecord> {
    let target = *grid.grid().descriptor("data transfer")?;
    let source = *block.grid().descriptor("data transfer")?;
    let (row, col) = offset;
    let (rows, cols) = (source.rows(), source.cols());

    let fits = |start: usize, len: usize, limit: usize| {
        start.checked_add(len).is_some_and(|end| end <= limit)
    };
    if !fits(row, rows, target.rows()) || !fits(col, cols, target.cols()) {
        return Err(GridError::OutOfBounds {
            row,
            col,
            rows,
            cols,
            grid_rows: target.rows(),
            grid_cols: target.cols(),
        });
    }

    let mut block = block.clone();
    if coord_labels.iter().all(|label| block.contains(label)) {
        block.sort_by_coords(coord_labels)?;
    }

    let mut output = grid.clone();
    for (label, values) in block.columns() {
        if coord_labels.contains(label) {
            continue;
        }
        let dest = output.column_mut(label)?;
        for (r, src_row) in values.chunks_exact(cols.max(1)).take(rows).enumerate() {
            let start = (row + r) * target.cols() + col;
            dest[start..start + cols].copy_from_slice(src_row);
        }
    }

    tracing::debug!(
        target: "flow_core::unify",
        row,
        col,
        rows,
        cols,
        "transfer_data.copied"
    );

    Ok(output)
}
