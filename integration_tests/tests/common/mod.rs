#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use flow_core::{FieldLabel, FieldRecord, GridDescriptor, GridInfo, ProcessingConfig};

static INIT: Once = Once::new();

pub const COORDS: [FieldLabel; 2] = [FieldLabel::X, FieldLabel::Y];

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("processing_config.json")
}

pub fn fixture_config() -> ProcessingConfig {
    ProcessingConfig::from_file(&fixture_path()).expect("fixture processing config")
}

/// Flow map on `descriptor` with every field constant.
pub fn uniform_map(descriptor: &GridDescriptor, mass: f64, u: f64, temperature: f64) -> FieldRecord {
    let (xs, ys) = descriptor.coordinates();
    let bins = descriptor.num_bins();
    FieldRecord::new(
        [
            ("X", xs),
            ("Y", ys),
            ("M", vec![mass; bins]),
            ("N", vec![1.0; bins]),
            ("T", vec![temperature; bins]),
            ("U", vec![u; bins]),
            ("V", vec![0.0; bins]),
        ],
        Some(GridInfo::structured(descriptor)),
    )
    .expect("uniform flow map")
}
