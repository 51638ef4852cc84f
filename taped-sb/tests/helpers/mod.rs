//! Test Helper Utilities
//!
//! Shared utilities for testing taped-sb
#![allow(dead_code)]

pub mod wav_engine;

use std::path::{Path, PathBuf};
use taped_common::config::{IntegrityPolicy, TomlConfig};
use taped_sb::PipelineSettings;

// Re-export commonly used items
pub use wav_engine::{read_samples, write_tone, WavEngine, SOURCE_RATE};

/// Pipeline settings writing WAV sprites into `out_dir` and the run workspace
/// under `work_dir`, so tests can check both
pub fn test_settings(input: &Path, out_dir: &Path, work_dir: &Path, policy: IntegrityPolicy) -> PipelineSettings {
    let mut config = TomlConfig::default();
    config.output.dir = out_dir.to_path_buf();
    config.output.formats = vec!["wav".to_string()];
    config.run.on_mismatch = policy;
    config.run.jobs = 2;

    let mut settings = PipelineSettings::from_config(input, &config);
    settings.workspace_parent = Some(work_dir.to_path_buf());
    settings
}

/// Entries left in a directory
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}
