use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{GridError, GridResult};
use crate::field::{Dtype, DtypeSpec, FieldLabel};
use crate::grid::{axis_mask, GridDescriptor, GridInfo, GridState, Limits};

/// Labelled equal-length value columns with optional lattice metadata.
///
/// Columns are stored contiguously and addressed by index; the label lookup
/// map is built once at construction. Clones are deep copies.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    labels: Vec<FieldLabel>,
    index: HashMap<FieldLabel, usize>,
    dtypes: Vec<Dtype>,
    columns: Vec<Vec<f64>>,
    grid: GridState,
}

impl FieldRecord {
    /// Build a record from `(label, values)` pairs or a label→values map.
    pub fn new<I, L>(columns: I, info: Option<GridInfo>) -> GridResult<Self>
    where
        I: IntoIterator<Item = (L, Vec<f64>)>,
        L: Into<FieldLabel>,
    {
        Self::with_dtypes(columns, &DtypeSpec::Inferred, info)
    }

    pub fn with_dtypes<I, L>(columns: I, dtypes: &DtypeSpec, info: Option<GridInfo>) -> GridResult<Self>
    where
        I: IntoIterator<Item = (L, Vec<f64>)>,
        L: Into<FieldLabel>,
    {
        let mut labels = Vec::new();
        let mut index = HashMap::new();
        let mut kinds = Vec::new();
        let mut data: Vec<Vec<f64>> = Vec::new();

        for (label, mut values) in columns {
            let label = label.into();
            if index.contains_key(&label) {
                return Err(GridError::Construction(format!(
                    "label '{label}' given more than once"
                )));
            }
            if let Some(first) = data.first() {
                if first.len() != values.len() {
                    return Err(GridError::Construction(
                        "added arrays not all of equal size".to_string(),
                    ));
                }
            }
            let dtype = dtypes.dtype_for(&label);
            if dtype != Dtype::F64 {
                values.iter_mut().for_each(|v| *v = dtype.quantize(*v));
            }
            index.insert(label.clone(), labels.len());
            labels.push(label);
            kinds.push(dtype);
            data.push(values);
        }

        let mut record = Self {
            labels,
            index,
            dtypes: kinds,
            columns: data,
            grid: GridState::default(),
        };
        if let Some(info) = info {
            record.grid = record.grid_from_info(info)?;
        }
        Ok(record)
    }

    pub(crate) fn from_parts(
        labels: Vec<FieldLabel>,
        dtypes: Vec<Dtype>,
        columns: Vec<Vec<f64>>,
        grid: GridState,
    ) -> Self {
        debug_assert_eq!(labels.len(), columns.len());
        debug_assert_eq!(labels.len(), dtypes.len());
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
        Self {
            labels,
            index,
            dtypes,
            columns,
            grid,
        }
    }

    fn grid_from_info(&self, info: GridInfo) -> GridResult<GridState> {
        if let Some(spacing) = info.spacing {
            if spacing.iter().any(|d| !d.is_finite() || *d <= 0.0) {
                return Err(GridError::Construction(format!(
                    "bin spacing must be positive, got {spacing:?}"
                )));
            }
        }
        let (Some(shape), Some(spacing)) = (info.shape, info.spacing) else {
            return Ok(GridState::Unstructured {
                spacing: info.spacing,
            });
        };

        let bins = shape[0].checked_mul(shape[1]).ok_or_else(|| {
            GridError::Construction(format!("shape {shape:?} has too many bins"))
        })?;
        if let Some(num_bins) = info.num_bins {
            if num_bins != bins {
                return Err(GridError::Construction(format!(
                    "num_bins {num_bins} does not match shape {shape:?}"
                )));
            }
        }
        if !self.labels.is_empty() && self.len() != bins {
            return Err(GridError::Construction(format!(
                "{} values do not fill a grid of shape {shape:?}",
                self.len()
            )));
        }

        let origin = info.origin.unwrap_or_else(|| {
            [
                self.min_of(&FieldLabel::X).unwrap_or(0.0),
                self.min_of(&FieldLabel::Y).unwrap_or(0.0),
            ]
        });
        Ok(GridState::Structured(GridDescriptor::new(origin, spacing, shape)))
    }

    /// Number of values in every column.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_bins(&self) -> usize {
        match &self.grid {
            GridState::Structured(descriptor) => descriptor.num_bins(),
            GridState::Unstructured { .. } => self.len(),
        }
    }

    pub fn labels(&self) -> &[FieldLabel] {
        &self.labels
    }

    pub fn contains(&self, label: &FieldLabel) -> bool {
        self.index.contains_key(label)
    }

    pub fn get(&self, label: &FieldLabel) -> GridResult<&[f64]> {
        self.position(label).map(|i| self.columns[i].as_slice())
    }

    pub fn dtype(&self, label: &FieldLabel) -> GridResult<Dtype> {
        self.position(label).map(|i| self.dtypes[i])
    }

    pub fn columns(&self) -> impl Iterator<Item = (&FieldLabel, &[f64])> {
        self.labels
            .iter()
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn info(&self) -> GridInfo {
        let mut info = GridInfo::from(&self.grid);
        info.num_bins = Some(self.num_bins());
        info
    }

    pub(crate) fn dtypes(&self) -> &[Dtype] {
        &self.dtypes
    }

    pub(crate) fn position(&self, label: &FieldLabel) -> GridResult<usize> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| GridError::LabelNotFound(label.clone()))
    }

    pub(crate) fn column_mut(&mut self, label: &FieldLabel) -> GridResult<&mut Vec<f64>> {
        let i = self.position(label)?;
        Ok(&mut self.columns[i])
    }

    pub(crate) fn coords(&self, coord_labels: &[FieldLabel; 2]) -> GridResult<(&[f64], &[f64])> {
        Ok((self.get(&coord_labels[0])?, self.get(&coord_labels[1])?))
    }

    fn min_of(&self, label: &FieldLabel) -> Option<f64> {
        self.get(label).ok()?.iter().copied().reduce(f64::min)
    }

    /// Indices of rows inside every `(label, limits)` pair, bounds inclusive.
    ///
    /// With no limits every row is selected.
    pub fn limit_indices(&self, limits: &[(FieldLabel, Limits)]) -> GridResult<Vec<usize>> {
        let mut keep = vec![true; self.len()];
        for (label, lims) in limits {
            let mask = axis_mask(label, self.get(label)?, *lims)?;
            keep.iter_mut().zip(mask).for_each(|(k, m)| *k &= m);
        }
        Ok(keep
            .into_iter()
            .enumerate()
            .filter_map(|(i, k)| k.then_some(i))
            .collect())
    }

    /// New record holding only the given rows. The result is unstructured.
    pub fn take(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|column| indices.iter().map(|&i| column[i]).collect())
            .collect();
        Self::from_parts(
            self.labels.clone(),
            self.dtypes.clone(),
            columns,
            self.grid.restricted(),
        )
    }

    /// Rows whose `label` value lies inside `limits`.
    ///
    /// The selection need not be rectangular so the result drops its shape
    /// and origin while keeping the spacing.
    pub fn restrict(&self, label: &FieldLabel, limits: Limits) -> GridResult<Self> {
        let indices = self.limit_indices(&[(label.clone(), limits)])?;
        Ok(self.take(&indices))
    }

    /// Rectangular cut along both coordinate axes.
    ///
    /// The surviving rows still form a lattice: its shape is the number of
    /// distinct coordinate values left per axis and its origin their minimum.
    pub fn cut(&self, coord_labels: &[FieldLabel; 2], xlim: Limits, ylim: Limits) -> GridResult<Self> {
        let spacing = self
            .grid
            .spacing()
            .ok_or(GridError::ShapeUndefined("cut without bin spacing"))?;
        let indices = self.limit_indices(&[
            (coord_labels[0].clone(), xlim),
            (coord_labels[1].clone(), ylim),
        ])?;
        let mut cut = self.take(&indices);

        let (xs, ys) = cut.coords(coord_labels)?;
        let shape = [distinct_count(xs), distinct_count(ys)];
        let origin = match (
            xs.iter().copied().reduce(f64::min),
            ys.iter().copied().reduce(f64::min),
        ) {
            (Some(x0), Some(y0)) => [x0, y0],
            _ => self.grid.origin().unwrap_or([0.0, 0.0]),
        };
        if shape[0] * shape[1] != cut.len() {
            return Err(GridError::Construction(format!(
                "cut kept {} values which do not fill a grid of shape {shape:?}",
                cut.len()
            )));
        }
        cut.grid = GridState::Structured(GridDescriptor::new(origin, spacing, shape));
        Ok(cut)
    }

    /// Sort rows in place by y, then x, putting them in raster order.
    pub fn sort_by_coords(&mut self, coord_labels: &[FieldLabel; 2]) -> GridResult<()> {
        let (xs, ys) = self.coords(coord_labels)?;
        let mut order: Vec<usize> = (0..xs.len()).collect();
        order.sort_by(|&a, &b| match ys[a].total_cmp(&ys[b]) {
            Ordering::Equal => xs[a].total_cmp(&xs[b]),
            other => other,
        });
        for column in &mut self.columns {
            *column = order.iter().map(|&i| column[i]).collect();
        }
        Ok(())
    }

    /// Shift every value of `label` by `delta` in place.
    ///
    /// Grid metadata is left alone; use [`FieldRecord::translate_coords`] to
    /// move a structured lattice.
    pub fn translate(&mut self, label: &FieldLabel, delta: f64) -> GridResult<()> {
        self.column_mut(label)?.iter_mut().for_each(|v| *v += delta);
        Ok(())
    }

    /// Shift both coordinate columns and the lattice origin in place.
    pub fn translate_coords(&mut self, coord_labels: &[FieldLabel; 2], delta: [f64; 2]) -> GridResult<()> {
        self.position(&coord_labels[0])?;
        self.position(&coord_labels[1])?;
        self.translate(&coord_labels[0], delta[0])?;
        self.translate(&coord_labels[1], delta[1])?;
        if let GridState::Structured(descriptor) = &mut self.grid {
            descriptor.origin[0] += delta[0];
            descriptor.origin[1] += delta[1];
        }
        Ok(())
    }
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}
