//! Numbering and grouping of per-frame map files.
//!
//! Frames are numbered consecutively and named `base + %05d + ext`. Averaging
//! runs over bundles of frames, each producing one output frame. Nothing here
//! touches the filesystem; callers pass a predicate telling which frame
//! numbers exist.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub group: u32,
    pub rolling: bool,
    pub begin: u32,
    pub end: Option<u32>,
    pub ext: String,
    pub outext: Option<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            group: 1,
            rolling: false,
            begin: 1,
            end: None,
            ext: ".dat".to_string(),
            outext: None,
        }
    }
}

impl BatchConfig {
    pub fn output_ext(&self) -> &str {
        self.outext.as_deref().unwrap_or(&self.ext)
    }

    /// Number of the first output frame.
    ///
    /// Rolling bundles keep the input numbering; plain bundles are numbered
    /// `ceil(begin / group)` so that output numbers follow the bundle index.
    pub fn first_output(&self) -> u32 {
        let group = self.group.max(1);
        if self.rolling {
            self.begin
        } else {
            self.begin.div_ceil(group)
        }
    }
}

pub fn frame_filename(base: &str, number: u32, ext: &str) -> String {
    format!("{base}{number:05}{ext}")
}

/// Consecutive available frame numbers from `begin`, up to `end` inclusive.
///
/// Stops at the first missing frame.
pub fn frame_numbers(begin: u32, end: Option<u32>, available: impl Fn(u32) -> bool) -> Vec<u32> {
    let mut numbers = Vec::new();
    let mut next = Some(begin);
    while let Some(number) = next {
        if end.is_some_and(|end| number > end) || !available(number) {
            break;
        }
        numbers.push(number);
        next = number.checked_add(1);
    }
    if numbers.is_empty() {
        tracing::warn!(
            target: "flow_core::batch",
            begin,
            "frames.none_found"
        );
    }
    numbers
}

/// One bundle of input frames and the frame number its result is written as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGroup {
    pub inputs: Vec<u32>,
    pub output: u32,
}

impl FrameGroup {
    pub fn input_names(&self, base: &str, ext: &str) -> Vec<String> {
        self.inputs
            .iter()
            .map(|&number| frame_filename(base, number, ext))
            .collect()
    }

    pub fn output_name(&self, base: &str, ext: &str) -> String {
        frame_filename(base, self.output, ext)
    }
}

/// Bundle available frames in groups of `config.group`.
///
/// Plain bundles are disjoint; rolling bundles advance by one frame. A
/// trailing bundle that cannot be filled is dropped.
pub fn group_frames(config: &BatchConfig, available: impl Fn(u32) -> bool) -> Vec<FrameGroup> {
    let group = config.group.max(1);
    let step = if config.rolling { 1 } else { group };
    let mut groups = Vec::new();
    let mut output = config.first_output();
    let mut begin = config.begin;

    loop {
        let Some(group_end) = begin.checked_add(group - 1) else {
            break;
        };
        if config.end.is_some_and(|end| group_end > end) {
            break;
        }
        let inputs = frame_numbers(begin, Some(group_end), &available);
        if inputs.len() != group as usize {
            break;
        }
        groups.push(FrameGroup { inputs, output });
        output += 1;
        match begin.checked_add(step) {
            Some(next) => begin = next,
            None => break,
        }
    }

    tracing::debug!(
        target: "flow_core::batch",
        groups = groups.len(),
        group,
        rolling = config.rolling,
        "frames.grouped"
    );
    groups
}
