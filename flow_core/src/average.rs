//! Ensemble averaging of records sampled on the same lattice.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::field::{Dtype, FieldLabel};
use crate::record::FieldRecord;
use crate::weights::{guarded_ratio, partition_labels, WeightPair};

/// Absolute and relative tolerance for comparing coordinates across frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub atol: f64,
    pub rtol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            atol: 1e-3,
            rtol: 1e-5,
        }
    }
}

impl Tolerance {
    /// `|a - b| <= atol + rtol * |b|`
    #[inline]
    pub fn is_close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.atol + self.rtol * b.abs()
    }

    fn all_close(&self, a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.is_close(*x, *y))
    }
}

/// Combines frames bin by bin.
///
/// Fields named in `weights` become `sum(field * weight) / sum(weight)` over
/// the frames, zero where the weights sum to zero. Every other data field
/// becomes its arithmetic mean.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAverager {
    pub coord_labels: [FieldLabel; 2],
    pub weights: Vec<WeightPair>,
    pub tolerance: Tolerance,
}

impl Default for FrameAverager {
    fn default() -> Self {
        Self::flow_maps()
    }
}

impl FrameAverager {
    pub fn new(coord_labels: [FieldLabel; 2], weights: Vec<WeightPair>) -> Self {
        Self {
            coord_labels,
            weights,
            tolerance: Tolerance::default(),
        }
    }

    /// Averager for sampled flow maps: mass-weighted velocities,
    /// number-weighted temperature.
    pub fn flow_maps() -> Self {
        Self::new([FieldLabel::X, FieldLabel::Y], WeightPair::flow_defaults())
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn average(&self, records: &[FieldRecord]) -> GridResult<FieldRecord> {
        let (first, rest) = records.split_first().ok_or(GridError::EmptyInput)?;
        // Bin-wise means need no shape, but a frame set must not mix states.
        if rest
            .iter()
            .any(|record| record.grid().is_structured() != first.grid().is_structured())
        {
            return Err(GridError::ShapeUndefined("frame averaging"));
        }
        self.check_coordinates(first, rest)?;

        let (plain, weighted) = partition_labels(first, &self.coord_labels, &self.weights)?;
        let frames = records.len() as f64;
        let bins = first.len();

        let mut weight_sums: HashMap<&FieldLabel, Vec<f64>> = HashMap::new();
        for pair in weighted.iter().copied() {
            if weight_sums.contains_key(&pair.weight) {
                continue;
            }
            let mut sums = vec![0.0; bins];
            for record in records {
                accumulate(&mut sums, record.get(&pair.weight)?, |w| w);
            }
            weight_sums.insert(&pair.weight, sums);
        }

        let mut averaged: HashMap<&FieldLabel, Vec<f64>> = HashMap::new();
        for label in plain {
            let mut sums = vec![0.0; bins];
            for record in records {
                accumulate(&mut sums, record.get(label)?, |v| v);
            }
            sums.iter_mut().for_each(|v| *v /= frames);
            averaged.insert(label, sums);
        }
        for pair in weighted {
            let mut sums = vec![0.0; bins];
            for record in records {
                let values = record.get(&pair.field)?;
                let weights = record.get(&pair.weight)?;
                for ((sum, v), w) in sums.iter_mut().zip(values).zip(weights) {
                    *sum += v * w;
                }
            }
            let totals = &weight_sums[&pair.weight];
            for (sum, total) in sums.iter_mut().zip(totals) {
                *sum = guarded_ratio(*sum, *total);
            }
            averaged.insert(&pair.field, sums);
        }

        let columns = first
            .columns()
            .map(|(label, values)| match averaged.remove(label) {
                Some(result) => result,
                None => values.to_vec(),
            })
            .collect();

        tracing::debug!(
            target: "flow_core::average",
            frames = records.len(),
            bins,
            weighted = self.weights.len(),
            "frames.averaged"
        );

        let dtypes = first
            .labels()
            .iter()
            .zip(first.dtypes())
            .map(|(label, dtype)| {
                if self.coord_labels.contains(label) {
                    *dtype
                } else {
                    Dtype::F64
                }
            })
            .collect();

        Ok(FieldRecord::from_parts(
            first.labels().to_vec(),
            dtypes,
            columns,
            *first.grid(),
        ))
    }

    fn check_coordinates(&self, first: &FieldRecord, rest: &[FieldRecord]) -> GridResult<()> {
        for (offset, record) in rest.iter().enumerate() {
            for label in &self.coord_labels {
                if !self.tolerance.all_close(first.get(label)?, record.get(label)?) {
                    return Err(GridError::CoordinateMismatch {
                        index: offset + 1,
                        label: label.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn accumulate(sums: &mut [f64], values: &[f64], map: impl Fn(f64) -> f64) {
    for (sum, v) in sums.iter_mut().zip(values) {
        *sum += map(*v);
    }
}
