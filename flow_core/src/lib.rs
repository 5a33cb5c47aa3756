//! Grid algebra for flow maps sampled from molecular-dynamics droplet runs.
//!
//! Per-frame maps are brought onto a common lattice with [`combined_grid`] and
//! [`transfer_data`], combined with a [`FrameAverager`], and rebinned with a
//! [`Resampler`]. All operations return new records; inputs are never changed.

pub mod average;
pub mod batch;
mod error;
mod field;
pub mod grid;
pub mod processing_config;
mod record;
pub mod resample;
pub mod unify;
mod weights;

pub use average::{FrameAverager, Tolerance};
pub use batch::{frame_filename, frame_numbers, group_frames, BatchConfig, FrameGroup};
pub use error::{GridError, GridResult};
pub use field::{Dtype, DtypeSpec, FieldLabel};
pub use grid::{axis_mask, GridDescriptor, GridInfo, GridState, Limits};
pub use processing_config::{
    load_processing_config_from_env, ProcessingConfig, ProcessingConfigError,
    ProcessingConfigMetadata,
};
pub use record::FieldRecord;
pub use resample::{downscaled_descriptor, downscaled_info, Resampler};
pub use unify::{block_offset, combined_grid, transfer_data};
pub use weights::{guarded_ratio, weighted_mean, WeightPair};
