use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label of a data field in a [`FieldRecord`](crate::FieldRecord).
///
/// The physical fields written by the flow-map sampler have dedicated variants;
/// anything else is carried as [`FieldLabel::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldLabel {
    X,
    Y,
    Mass,
    Number,
    Temperature,
    U,
    V,
    Custom(String),
}

impl FieldLabel {
    pub fn as_str(&self) -> &str {
        match self {
            FieldLabel::X => "X",
            FieldLabel::Y => "Y",
            FieldLabel::Mass => "M",
            FieldLabel::Number => "N",
            FieldLabel::Temperature => "T",
            FieldLabel::U => "U",
            FieldLabel::V => "V",
            FieldLabel::Custom(name) => name,
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }
}

impl From<&str> for FieldLabel {
    fn from(value: &str) -> Self {
        match value {
            "X" => FieldLabel::X,
            "Y" => FieldLabel::Y,
            "M" => FieldLabel::Mass,
            "N" => FieldLabel::Number,
            "T" => FieldLabel::Temperature,
            "U" => FieldLabel::U,
            "V" => FieldLabel::V,
            other => FieldLabel::Custom(other.to_string()),
        }
    }
}

impl From<String> for FieldLabel {
    fn from(value: String) -> Self {
        match FieldLabel::from(value.as_str()) {
            FieldLabel::Custom(_) => FieldLabel::Custom(value),
            known => known,
        }
    }
}

impl From<FieldLabel> for String {
    fn from(value: FieldLabel) -> Self {
        match value {
            FieldLabel::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for FieldLabel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FieldLabel::from(s))
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage precision of a field.
///
/// Every column is held as `f64`; the tag records which precision the values
/// were quantized through when the record was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    F32,
    #[default]
    F64,
    I64,
}

impl Dtype {
    #[inline]
    pub fn quantize(self, value: f64) -> f64 {
        match self {
            Dtype::F32 => value as f32 as f64,
            Dtype::F64 => value,
            Dtype::I64 => value as i64 as f64,
        }
    }
}

/// Explicit precision override applied at record construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DtypeSpec {
    #[default]
    Inferred,
    Uniform(Dtype),
    PerField(Vec<(FieldLabel, Dtype)>),
}

impl DtypeSpec {
    pub(crate) fn dtype_for(&self, label: &FieldLabel) -> Dtype {
        match self {
            DtypeSpec::Inferred => Dtype::F64,
            DtypeSpec::Uniform(dtype) => *dtype,
            DtypeSpec::PerField(pairs) => pairs
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, dtype)| *dtype)
                .unwrap_or_default(),
        }
    }
}
