//! Changing the bin resolution of a structured record by integer factors.
//!
//! Downsampling sums the fine bins covered by each coarse bin, so extensive
//! fields such as mass or particle count are conserved. Supersampling splits
//! every bin into `factor x factor` bins and smooths the blocky result with a
//! centred window of `2 * factor - 1` bins per axis. Fields named in the
//! weight pairs are weighted means in both directions.

use std::ops::Range;

use ndarray::{s, Array2, ArrayView2};

use crate::error::{GridError, GridResult};
use crate::field::{Dtype, FieldLabel};
use crate::grid::{GridDescriptor, GridInfo, GridState, Limits};
use crate::record::FieldRecord;
use crate::weights::{guarded_ratio, partition_labels, weighted_mean, WeightPair};

#[derive(Debug, Clone, PartialEq)]
pub struct Resampler {
    pub coord_labels: [FieldLabel; 2],
    pub weights: Vec<WeightPair>,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::flow_maps()
    }
}

impl Resampler {
    pub fn new(coord_labels: [FieldLabel; 2], weights: Vec<WeightPair>) -> Self {
        Self {
            coord_labels,
            weights,
        }
    }

    pub fn flow_maps() -> Self {
        Self::new([FieldLabel::X, FieldLabel::Y], WeightPair::flow_defaults())
    }

    /// Combine `num_combine = [nx, ny]` neighbouring bins into one.
    ///
    /// Bins are combined from index `(0, 0)` upwards. Trailing bins along
    /// positive x and y that do not fill a whole combined bin are dropped.
    /// With `xlim` or `ylim` set the record is first cut to those limits.
    pub fn downsample(
        &self,
        record: &FieldRecord,
        num_combine: [usize; 2],
        xlim: Limits,
        ylim: Limits,
    ) -> GridResult<FieldRecord> {
        if let Some(&factor) = num_combine.iter().find(|&&n| n == 0) {
            return Err(GridError::InvalidFactor(factor));
        }

        let mut source = if xlim != (None, None) || ylim != (None, None) {
            record.cut(&self.coord_labels, xlim, ylim)?
        } else {
            record.clone()
        };
        let fine = *source.grid().descriptor("downsampling")?;
        source.sort_by_coords(&self.coord_labels)?;

        let coarse = downscaled_descriptor(&fine, num_combine);
        let (plain, weighted) = partition_labels(&source, &self.coord_labels, &self.weights)?;
        let (xs, ys) = coarse.coordinates();

        // Sums keep their precision; bin centres and weighted means are real.
        let mut columns = Vec::with_capacity(source.labels().len());
        let mut dtypes = Vec::with_capacity(source.labels().len());
        for ((label, values), dtype) in source.columns().zip(source.dtypes()) {
            let (column, dtype) = if *label == self.coord_labels[0] {
                (xs.clone(), Dtype::F64)
            } else if *label == self.coord_labels[1] {
                (ys.clone(), Dtype::F64)
            } else if let Some(pair) = weighted.iter().find(|pair| pair.field == *label) {
                let weights = raster(&fine, source.get(&pair.weight)?)?;
                let means =
                    combine_bins(&raster(&fine, values)?, Some(&weights), &coarse, num_combine);
                (means, Dtype::F64)
            } else {
                debug_assert!(plain.contains(&label));
                let sums = combine_bins(&raster(&fine, values)?, None, &coarse, num_combine);
                (sums, *dtype)
            };
            columns.push(column);
            dtypes.push(dtype);
        }

        tracing::debug!(
            target: "flow_core::resample",
            from_nx = fine.cols(),
            from_ny = fine.rows(),
            to_nx = coarse.cols(),
            to_ny = coarse.rows(),
            "downsample.combined"
        );

        Ok(FieldRecord::from_parts(
            source.labels().to_vec(),
            dtypes,
            columns,
            GridState::Structured(coarse),
        ))
    }

    /// Split every bin into `factor x factor` bins.
    ///
    /// `None` or `Some(1)` returns a copy of the input.
    pub fn supersample(&self, record: &FieldRecord, factor: Option<usize>) -> GridResult<FieldRecord> {
        let factor = match factor {
            None | Some(1) => return Ok(record.clone()),
            Some(0) => return Err(GridError::InvalidFactor(0)),
            Some(factor) => factor,
        };

        let mut source = record.clone();
        source.sort_by_coords(&self.coord_labels)?;
        let coarse = *source.grid().descriptor("supersampling")?;
        let fine = superscaled_descriptor(&source, &coarse, &self.coord_labels, factor)?;

        let (plain, weighted) = partition_labels(&source, &self.coord_labels, &self.weights)?;
        let expanded = |label: &FieldLabel| -> GridResult<Array2<f64>> {
            Ok(expand_bins(&raster(&coarse, source.get(label)?)?, factor))
        };
        let (xs, ys) = fine.coordinates();
        let reach = factor - 1;

        let mut columns = Vec::with_capacity(source.labels().len());
        for label in source.labels() {
            let column = if *label == self.coord_labels[0] {
                xs.clone()
            } else if *label == self.coord_labels[1] {
                ys.clone()
            } else if let Some(pair) = weighted.iter().find(|pair| pair.field == *label) {
                let weights = expanded(&pair.weight)?;
                let products = expanded(label)? * &weights;
                smooth(fine.shape, reach, |rows, cols| {
                    let total = weights.slice(s![rows.clone(), cols.clone()]).sum();
                    guarded_ratio(products.slice(s![rows, cols]).sum(), total)
                })
            } else {
                debug_assert!(plain.contains(&label));
                let values = expanded(label)?;
                smooth(fine.shape, reach, |rows, cols| {
                    let window = values.slice(s![rows, cols]);
                    window.sum() / window.len() as f64
                })
            };
            columns.push(column);
        }

        tracing::debug!(
            target: "flow_core::resample",
            factor,
            to_nx = fine.cols(),
            to_ny = fine.rows(),
            "supersample.split"
        );

        // Every split and smoothed column is a real-valued mean.
        Ok(FieldRecord::from_parts(
            source.labels().to_vec(),
            vec![Dtype::F64; source.labels().len()],
            columns,
            GridState::Structured(fine),
        ))
    }
}

/// Lattice of combined bins, each centred over the fine bins it covers.
pub fn downscaled_descriptor(fine: &GridDescriptor, num_combine: [usize; 2]) -> GridDescriptor {
    let spacing = [
        fine.spacing[0] * num_combine[0] as f64,
        fine.spacing[1] * num_combine[1] as f64,
    ];
    let origin = [
        fine.origin[0] + 0.5 * (spacing[0] - fine.spacing[0]),
        fine.origin[1] + 0.5 * (spacing[1] - fine.spacing[1]),
    ];
    let shape = [fine.shape[0] / num_combine[0], fine.shape[1] / num_combine[1]];
    GridDescriptor::new(origin, spacing, shape)
}

/// Info of a downsampled grid, as reported alongside written maps.
pub fn downscaled_info(fine: &GridDescriptor, num_combine: [usize; 2]) -> GridInfo {
    GridInfo::structured(&downscaled_descriptor(fine, num_combine))
}

fn superscaled_descriptor(
    source: &FieldRecord,
    coarse: &GridDescriptor,
    coord_labels: &[FieldLabel; 2],
    factor: usize,
) -> GridResult<GridDescriptor> {
    let (xs, ys) = source.coords(coord_labels)?;
    let origin = match (
        xs.iter().copied().reduce(f64::min),
        ys.iter().copied().reduce(f64::min),
    ) {
        (Some(x0), Some(y0)) => [x0, y0],
        _ => coarse.origin,
    };
    let spacing = [
        coarse.spacing[0] / factor as f64,
        coarse.spacing[1] / factor as f64,
    ];
    let shape = [coarse.shape[0] * factor, coarse.shape[1] * factor];
    Ok(GridDescriptor::new(origin, spacing, shape))
}

fn raster<'a>(grid: &GridDescriptor, values: &'a [f64]) -> GridResult<ArrayView2<'a, f64>> {
    ArrayView2::from_shape((grid.rows(), grid.cols()), values)
        .map_err(|err| GridError::Construction(format!("cannot reshape values onto grid: {err}")))
}

fn combine_bins(
    values: &ArrayView2<f64>,
    weights: Option<&ArrayView2<f64>>,
    coarse: &GridDescriptor,
    num_combine: [usize; 2],
) -> Vec<f64> {
    let [nx, ny] = num_combine;
    let mut combined = Vec::with_capacity(coarse.num_bins());
    for i in 0..coarse.rows() {
        for j in 0..coarse.cols() {
            let window = values.slice(s![ny * i..ny * (i + 1), nx * j..nx * (j + 1)]);
            let value = match weights {
                Some(weights) => {
                    let weights = weights.slice(s![ny * i..ny * (i + 1), nx * j..nx * (j + 1)]);
                    weighted_mean(window.iter().zip(weights.iter()))
                }
                None => window.sum(),
            };
            combined.push(value);
        }
    }
    combined
}

/// Nearest-neighbour expansion of every bin into a `factor x factor` block.
fn expand_bins(values: &ArrayView2<f64>, factor: usize) -> Array2<f64> {
    let (rows, cols) = values.dim();
    Array2::from_shape_fn((rows * factor, cols * factor), |(i, j)| {
        values[[i / factor, j / factor]]
    })
}

/// Evaluate `window` over the clamped `2 * reach + 1` neighbourhood of every bin.
fn smooth(
    shape: [usize; 2],
    reach: usize,
    mut window: impl FnMut(Range<usize>, Range<usize>) -> f64,
) -> Vec<f64> {
    let [nx, ny] = shape;
    let mut smoothed = Vec::with_capacity(nx * ny);
    for i in 0..ny {
        let rows = i.saturating_sub(reach)..(i + reach + 1).min(ny);
        for j in 0..nx {
            let cols = j.saturating_sub(reach)..(j + reach + 1).min(nx);
            smoothed.push(window(rows.clone(), cols));
        }
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lattice(nx: usize, ny: usize, origin: [f64; 2]) -> (GridDescriptor, Vec<f64>, Vec<f64>) {
        let descriptor = GridDescriptor::new(origin, [1.0, 1.0], [nx, ny]);
        let (xs, ys) = descriptor.coordinates();
        (descriptor, xs, ys)
    }

    fn plain_record(nx: usize, ny: usize) -> FieldRecord {
        let (descriptor, xs, ys) = lattice(nx, ny, [0.0, 0.0]);
        let cs = (0..nx * ny).map(|i| i as f64).collect();
        FieldRecord::new(
            [("X", xs), ("Y", ys), ("C", cs)],
            Some(GridInfo::structured(&descriptor)),
        )
        .unwrap()
    }

    fn plain_resampler() -> Resampler {
        Resampler::new([FieldLabel::X, FieldLabel::Y], Vec::new())
    }

    #[test]
    fn downscaled_grid_is_centred_over_combined_bins() {
        let fine = GridDescriptor::new([0.0, 1.0], [0.5, 1.0], [8, 6]);
        let coarse = downscaled_descriptor(&fine, [2, 3]);
        assert_eq!(coarse.shape, [4, 2]);
        assert_eq!(coarse.spacing, [1.0, 3.0]);
        assert_eq!(coarse.origin, [0.25, 2.0]);
    }

    #[test]
    fn downsample_sums_plain_fields() {
        let record = plain_record(8, 6);
        let combined = plain_resampler()
            .downsample(&record, [2, 1], (None, None), (None, None))
            .unwrap();

        assert_eq!(combined.grid().shape(), Some([4, 6]));
        let cs = combined.get(&FieldLabel::custom("C")).unwrap();
        // first row: 0+1, 2+3, 4+5, 6+7
        assert_eq!(&cs[..4], &[1.0, 5.0, 9.0, 13.0]);
        assert_eq!(cs.iter().sum::<f64>(), (0..48).sum::<usize>() as f64);
        assert_eq!(&combined.get(&FieldLabel::X).unwrap()[..4], &[0.5, 2.5, 4.5, 6.5]);
    }

    #[test]
    fn downsample_drops_trailing_bins() {
        let record = plain_record(5, 3);
        let combined = plain_resampler()
            .downsample(&record, [2, 2], (None, None), (None, None))
            .unwrap();
        assert_eq!(combined.grid().shape(), Some([2, 1]));
        let cs = combined.get(&FieldLabel::custom("C")).unwrap();
        assert_eq!(cs, &[0.0 + 1.0 + 5.0 + 6.0, 2.0 + 3.0 + 7.0 + 8.0]);
    }

    #[test]
    fn downsample_weighs_declared_fields() {
        let (descriptor, xs, ys) = lattice(2, 1, [0.0, 0.0]);
        let record = FieldRecord::new(
            [
                ("X", xs),
                ("Y", ys),
                ("M", vec![1.0, 3.0]),
                ("U", vec![2.0, 6.0]),
            ],
            Some(GridInfo::structured(&descriptor)),
        )
        .unwrap();
        let resampler = Resampler::new(
            [FieldLabel::X, FieldLabel::Y],
            vec![WeightPair::new(FieldLabel::U, FieldLabel::Mass)],
        );
        let combined = resampler
            .downsample(&record, [2, 1], (None, None), (None, None))
            .unwrap();
        assert_eq!(combined.get(&FieldLabel::Mass).unwrap(), &[4.0]);
        assert_relative_eq!(combined.get(&FieldLabel::U).unwrap()[0], 5.0);
    }

    #[test]
    fn downsample_with_zero_weight_gives_zero() {
        let (descriptor, xs, ys) = lattice(2, 1, [0.0, 0.0]);
        let record = FieldRecord::new(
            [("X", xs), ("Y", ys), ("M", vec![0.0, 0.0]), ("U", vec![2.0, 6.0])],
            Some(GridInfo::structured(&descriptor)),
        )
        .unwrap();
        let combined = Resampler::flow_maps()
            .downsample(&record, [2, 1], (None, None), (None, None));
        // flow defaults also weigh V and T, which this record lacks
        assert!(matches!(combined, Err(GridError::LabelNotFound(_))));

        let resampler = Resampler::new(
            [FieldLabel::X, FieldLabel::Y],
            vec![WeightPair::new(FieldLabel::U, FieldLabel::Mass)],
        );
        let combined = resampler
            .downsample(&record, [2, 1], (None, None), (None, None))
            .unwrap();
        assert_eq!(combined.get(&FieldLabel::U).unwrap(), &[0.0]);
    }

    #[test]
    fn downsample_within_limits_cuts_first() {
        let record = plain_record(8, 6);
        let combined = plain_resampler()
            .downsample(&record, [2, 2], (Some(2.0), Some(5.0)), (Some(1.0), Some(4.0)))
            .unwrap();
        let descriptor = combined.grid().descriptor("test").unwrap();
        assert_eq!(descriptor.shape, [2, 2]);
        assert_eq!(descriptor.origin, [2.5, 1.5]);
        // bins (x=2,3; y=1,2) of the 8-wide lattice
        let first = 8.0 + 2.0 + 8.0 + 3.0 + 16.0 + 2.0 + 16.0 + 3.0;
        assert_eq!(combined.get(&FieldLabel::custom("C")).unwrap()[0], first);
    }

    #[test]
    fn downsample_requires_structure_and_factor() {
        let record = plain_record(4, 4);
        assert_eq!(
            plain_resampler().downsample(&record, [0, 1], (None, None), (None, None)),
            Err(GridError::InvalidFactor(0))
        );
        let loose = record.restrict(&FieldLabel::X, (None, None)).unwrap();
        assert_eq!(
            plain_resampler().downsample(&loose, [2, 2], (None, None), (None, None)),
            Err(GridError::ShapeUndefined("downsampling"))
        );
    }

    #[test]
    fn downsample_sorts_shuffled_input() {
        let record = plain_record(4, 2);
        let order = [7, 2, 5, 0, 3, 6, 1, 4];
        let taken = record.take(&order);
        let shuffled = FieldRecord::new(
            taken.columns().map(|(l, v)| (l.clone(), v.to_vec())),
            Some(record.info()),
        )
        .unwrap();
        let a = plain_resampler()
            .downsample(&record, [2, 2], (None, None), (None, None))
            .unwrap();
        let b = plain_resampler()
            .downsample(&shuffled, [2, 2], (None, None), (None, None))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn supersample_by_one_is_identity() {
        let record = plain_record(3, 2);
        assert_eq!(plain_resampler().supersample(&record, Some(1)).unwrap(), record);
        assert_eq!(plain_resampler().supersample(&record, None).unwrap(), record);
    }

    #[test]
    fn supersample_splits_bins_and_smooths() {
        let (descriptor, xs, ys) = lattice(2, 1, [0.0, 0.0]);
        let record = FieldRecord::new(
            [("X", xs), ("Y", ys), ("C", vec![0.0, 4.0])],
            Some(GridInfo::structured(&descriptor)),
        )
        .unwrap();
        let fine = plain_resampler().supersample(&record, Some(2)).unwrap();

        let grid = fine.grid().descriptor("test").unwrap();
        assert_eq!(grid.shape, [4, 2]);
        assert_eq!(grid.spacing, [0.5, 0.5]);
        assert_eq!(grid.origin, [0.0, 0.0]);
        assert_eq!(fine.get(&FieldLabel::X).unwrap(), &[0.0, 0.5, 1.0, 1.5, 0.0, 0.5, 1.0, 1.5]);

        // blocky row is [0, 0, 4, 4], smoothed with a 3-wide clamped window
        let cs = fine.get(&FieldLabel::custom("C")).unwrap();
        let row = [0.0, 4.0 / 3.0, 8.0 / 3.0, 4.0];
        for (value, expected) in cs.iter().zip(row.iter().chain(row.iter())) {
            assert_relative_eq!(*value, *expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn supersample_weighs_declared_fields() {
        let (descriptor, xs, ys) = lattice(2, 1, [0.0, 0.0]);
        let record = FieldRecord::new(
            [("X", xs), ("Y", ys), ("M", vec![1.0, 0.0]), ("U", vec![3.0, 7.0])],
            Some(GridInfo::structured(&descriptor)),
        )
        .unwrap();
        let resampler = Resampler::new(
            [FieldLabel::X, FieldLabel::Y],
            vec![WeightPair::new(FieldLabel::U, FieldLabel::Mass)],
        );
        let fine = resampler.supersample(&record, Some(2)).unwrap();
        let u = fine.get(&FieldLabel::U).unwrap();
        // the massless right bin only sees its massive neighbour at its inner edge
        assert_relative_eq!(u[0], 3.0);
        assert_relative_eq!(u[2], 3.0);
        assert_eq!(u[3], 0.0);
        let m = fine.get(&FieldLabel::Mass).unwrap();
        assert_relative_eq!(m[1], 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn derived_columns_are_tagged_real() {
        let (descriptor, xs, ys) = lattice(2, 1, [0.0, 0.0]);
        let record = FieldRecord::with_dtypes(
            [("X", xs), ("Y", ys), ("N", vec![1.0, 2.0]), ("U", vec![1.0, 2.0])],
            &crate::field::DtypeSpec::Uniform(Dtype::I64),
            Some(GridInfo::structured(&descriptor)),
        )
        .unwrap();
        let resampler = Resampler::new(
            [FieldLabel::X, FieldLabel::Y],
            vec![WeightPair::new(FieldLabel::U, FieldLabel::Number)],
        );

        let coarse = resampler
            .downsample(&record, [2, 1], (None, None), (None, None))
            .unwrap();
        assert_eq!(coarse.dtype(&FieldLabel::Number).unwrap(), Dtype::I64);
        assert_eq!(coarse.dtype(&FieldLabel::U).unwrap(), Dtype::F64);
        assert_eq!(coarse.dtype(&FieldLabel::X).unwrap(), Dtype::F64);
        assert_relative_eq!(coarse.get(&FieldLabel::U).unwrap()[0], 5.0 / 3.0);

        let fine = resampler.supersample(&record, Some(2)).unwrap();
        for label in fine.labels() {
            assert_eq!(fine.dtype(label).unwrap(), Dtype::F64);
        }
    }

    #[test]
    fn supersample_requires_structure() {
        let loose = plain_record(2, 2).restrict(&FieldLabel::X, (None, None)).unwrap();
        assert_eq!(
            plain_resampler().supersample(&loose, Some(2)),
            Err(GridError::ShapeUndefined("supersampling"))
        );
        assert_eq!(
            plain_resampler().supersample(&plain_record(2, 2), Some(0)),
            Err(GridError::InvalidFactor(0))
        );
    }
}
