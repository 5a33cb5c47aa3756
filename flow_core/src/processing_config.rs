//! Configuration for averaging and resampling of flow maps.
//!
//! Loaded from `processing_config.json` with support for an environment
//! variable override.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

use crate::average::{FrameAverager, Tolerance};
use crate::batch::BatchConfig;
use crate::field::FieldLabel;
use crate::resample::Resampler;
use crate::weights::WeightPair;

pub const BUILTIN_PROCESSING_CONFIG: &str = include_str!("data/processing_config.json");

pub const PROCESSING_CONFIG_ENV: &str = "FLOW_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub coord_labels: [FieldLabel; 2],
    pub weights: Vec<WeightPair>,
    pub tolerance: Tolerance,
    pub batch: BatchConfig,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            coord_labels: [FieldLabel::X, FieldLabel::Y],
            weights: WeightPair::flow_defaults(),
            tolerance: Tolerance::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl ProcessingConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_PROCESSING_CONFIG)
                .expect("builtin processing config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ProcessingConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ProcessingConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ProcessingConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn averager(&self) -> FrameAverager {
        FrameAverager::new(self.coord_labels.clone(), self.weights.clone())
            .with_tolerance(self.tolerance)
    }

    pub fn resampler(&self) -> Resampler {
        Resampler::new(self.coord_labels.clone(), self.weights.clone())
    }
}

#[derive(Debug, Error)]
pub enum ProcessingConfigError {
    #[error("failed to parse processing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read processing config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Metadata about where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingConfigMetadata {
    path: Option<PathBuf>,
}

impl ProcessingConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load the processing configuration from `FLOW_CONFIG_PATH`, falling back to
/// the builtin configuration.
pub fn load_processing_config_from_env() -> (Arc<ProcessingConfig>, ProcessingConfigMetadata) {
    if let Some(path) = env::var(PROCESSING_CONFIG_ENV).ok().map(PathBuf::from) {
        match ProcessingConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "flow_core::config",
                    path = %path.display(),
                    "processing_config.loaded=file"
                );
                return (
                    Arc::new(config),
                    ProcessingConfigMetadata::new(Some(path)),
                );
            }
            Err(err) => {
                tracing::warn!(
                    target: "flow_core::config",
                    path = %path.display(),
                    error = %err,
                    "processing_config.load_failed"
                );
            }
        }
    }

    let config = ProcessingConfig::builtin();
    tracing::info!(
        target: "flow_core::config",
        "processing_config.loaded=builtin"
    );
    (config, ProcessingConfigMetadata::new(None))
}
