use serde::{Deserialize, Serialize};

use crate::error::GridResult;
use crate::field::FieldLabel;
use crate::record::FieldRecord;

/// A field averaged as `sum(field * weight) / sum(weight)` instead of being
/// summed or plainly averaged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightPair {
    pub field: FieldLabel,
    pub weight: FieldLabel,
}

impl WeightPair {
    pub fn new(field: impl Into<FieldLabel>, weight: impl Into<FieldLabel>) -> Self {
        Self {
            field: field.into(),
            weight: weight.into(),
        }
    }

    /// Flow velocities weighted by mass and temperature weighted by number.
    pub fn flow_defaults() -> Vec<WeightPair> {
        vec![
            WeightPair::new(FieldLabel::U, FieldLabel::Mass),
            WeightPair::new(FieldLabel::V, FieldLabel::Mass),
            WeightPair::new(FieldLabel::Temperature, FieldLabel::Number),
        ]
    }
}

/// `numerator / denominator`, or zero when the denominator is zero.
#[inline]
pub fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Weighted mean of `values`; zero when the weights sum to zero.
pub fn weighted_mean<'a, I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (&'a f64, &'a f64)>,
{
    let (weighted, total) = pairs
        .into_iter()
        .fold((0.0_f64, 0.0_f64), |(sum, total), (v, w)| {
            (sum + v * w, total + w)
        });
    guarded_ratio(weighted, total)
}

/// Non-coordinate labels of `record` split into plain and weighted fields.
///
/// Every declared pair must name fields present in the record.
pub(crate) fn partition_labels<'a>(
    record: &'a FieldRecord,
    coord_labels: &[FieldLabel; 2],
    weights: &'a [WeightPair],
) -> GridResult<(Vec<&'a FieldLabel>, Vec<&'a WeightPair>)> {
    for pair in weights {
        record.position(&pair.field)?;
        record.position(&pair.weight)?;
    }
    let plain = record
        .labels()
        .iter()
        .filter(|label| !coord_labels.contains(*label))
        .filter(|label| weights.iter().all(|pair| &pair.field != *label))
        .collect();
    let weighted = weights
        .iter()
        .filter(|pair| !coord_labels.contains(&pair.field))
        .collect();
    Ok((plain, weighted))
}
